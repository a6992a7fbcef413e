use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use hiring_pipeline::error::AppError;
use hiring_pipeline::workflows::ats::AtsFeedImporter;
use hiring_pipeline::workflows::pipeline::{
    pipeline_router, Clock, ImportSummary, NotificationSink, PipelineService,
};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

pub(crate) fn with_pipeline_routes<N, C>(service: Arc<PipelineService<N, C>>) -> axum::Router
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    pipeline_router(service.clone())
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/pipeline/import/ats",
            axum::routing::post(ats_import_endpoint::<N, C>),
        )
        .layer(Extension(service))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Accepts a raw ATS CSV export as the request body.
pub(crate) async fn ats_import_endpoint<N, C>(
    Extension(service): Extension<Arc<PipelineService<N, C>>>,
    body: String,
) -> Result<Json<ImportSummary>, AppError>
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let feed = AtsFeedImporter::from_reader(Cursor::new(body.into_bytes()))?;
    Ok(Json(feed.import_into(&service)))
}
