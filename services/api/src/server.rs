use crate::cli::ServeArgs;
use crate::infra::{AppState, TracingNotificationSink};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hiring_pipeline::config::AppConfig;
use hiring_pipeline::error::AppError;
use hiring_pipeline::telemetry;
use hiring_pipeline::workflows::ats::AtsFeedImporter;
use hiring_pipeline::workflows::pipeline::{
    load_registry, CandidateStore, PipelineService, SystemClock,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let registry = Arc::new(load_registry(config.pipeline.stage_catalog.as_deref())?);
    info!(
        stages = registry.len(),
        catalog = ?config.pipeline.stage_catalog,
        "stage catalog loaded"
    );

    let store = Arc::new(
        CandidateStore::new(registry).with_overdue_grace(config.pipeline.overdue_grace()),
    );
    let service = Arc::new(PipelineService::with_store(
        store,
        Arc::new(TracingNotificationSink),
        Arc::new(SystemClock),
    ));

    if let Some(feed) = args.feed.take() {
        let summary = AtsFeedImporter::from_path(&feed)?.import_into(&service);
        if !summary.rejected.is_empty() {
            warn!(
                path = %feed.display(),
                rejected = summary.rejected.len(),
                "some ATS rows were not imported"
            );
        }
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_pipeline_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hiring pipeline service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
