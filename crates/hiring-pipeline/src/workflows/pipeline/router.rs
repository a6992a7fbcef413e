use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::bulk::{BulkAction, BulkResult};
use super::clock::Clock;
use super::domain::{CandidateId, CandidateImport, ErrorKind, StageId};
use super::metrics::{PipelineMetrics, StageSummary};
use super::notify::NotificationSink;
use super::service::PipelineService;
use super::transition::Move;
use super::view::{FilterSpec, SortDirection, SortKey, SortSpec, StatusFilter};

/// Router builder exposing the pipeline engine over HTTP.
pub fn pipeline_router<N, C>(service: Arc<PipelineService<N, C>>) -> Router
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/api/v1/pipeline/stages", get(stages_handler::<N, C>))
        .route(
            "/api/v1/pipeline/stages/:stage_id/candidates",
            get(view_handler::<N, C>),
        )
        .route("/api/v1/pipeline/candidates", post(import_handler::<N, C>))
        .route(
            "/api/v1/pipeline/candidates/batch",
            post(import_batch_handler::<N, C>),
        )
        .route(
            "/api/v1/pipeline/candidates/:candidate_id",
            get(candidate_handler::<N, C>),
        )
        .route(
            "/api/v1/pipeline/candidates/:candidate_id/move",
            post(move_handler::<N, C>),
        )
        .route(
            "/api/v1/pipeline/candidates/:candidate_id/feedback",
            post(feedback_handler::<N, C>),
        )
        .route("/api/v1/pipeline/metrics", get(metrics_handler::<N, C>))
        .route("/api/v1/pipeline/bulk", post(bulk_handler::<N, C>))
        .route("/api/v1/pipeline/selection", get(selection_handler::<N, C>))
        .route(
            "/api/v1/pipeline/selection/:candidate_id/toggle",
            post(toggle_handler::<N, C>),
        )
        .route(
            "/api/v1/pipeline/selection/apply",
            post(apply_selection_handler::<N, C>),
        )
        .with_state(service)
}

type SharedService<N, C> = State<Arc<PipelineService<N, C>>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ViewQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) status: StatusFilter,
    #[serde(default)]
    pub(crate) sort: SortKey,
    #[serde(default)]
    pub(crate) direction: SortDirection,
}

impl ViewQuery {
    fn specs(self) -> (FilterSpec, SortSpec) {
        let filter = FilterSpec {
            search_text: self.search.unwrap_or_default(),
            status: self.status,
        };
        (filter, SortSpec::new(self.sort, self.direction))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedbackUpdate {
    pub(crate) needs_feedback: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BulkRequest {
    pub(crate) action: BulkAction,
    pub(crate) candidate_ids: Vec<CandidateId>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MetricsResponse {
    pub(crate) metrics: PipelineMetrics,
    pub(crate) stages: Vec<StageSummary>,
}

pub(crate) fn error_response(kind: ErrorKind, message: String) -> Response {
    let status = match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::FeedbackRequired | ErrorKind::TerminalState => StatusCode::CONFLICT,
    };
    let payload = json!({
        "error": message,
        "kind": kind.label(),
    });
    (status, Json(payload)).into_response()
}

pub(crate) async fn stages_handler<N, C>(State(service): SharedService<N, C>) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    (StatusCode::OK, Json(service.stages())).into_response()
}

pub(crate) async fn import_handler<N, C>(
    State(service): SharedService<N, C>,
    Json(import): Json<CandidateImport>,
) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    match service.import_candidate(import) {
        Ok(candidate) => (StatusCode::CREATED, Json(candidate)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn import_batch_handler<N, C>(
    State(service): SharedService<N, C>,
    Json(imports): Json<Vec<CandidateImport>>,
) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let summary = service.import_batch(imports);
    (StatusCode::OK, Json(summary)).into_response()
}

pub(crate) async fn candidate_handler<N, C>(
    State(service): SharedService<N, C>,
    Path(candidate_id): Path<String>,
) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    match service.get(&CandidateId(candidate_id)) {
        Ok(candidate) => (StatusCode::OK, Json(candidate)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn move_handler<N, C>(
    State(service): SharedService<N, C>,
    Path(candidate_id): Path<String>,
    Json(requested): Json<Move>,
) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    match service.move_candidate(&CandidateId(candidate_id), requested) {
        Ok(candidate) => (StatusCode::OK, Json(candidate)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn feedback_handler<N, C>(
    State(service): SharedService<N, C>,
    Path(candidate_id): Path<String>,
    Json(update): Json<FeedbackUpdate>,
) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let id = CandidateId(candidate_id);
    let outcome = if update.needs_feedback {
        service.request_feedback(&id)
    } else {
        service.record_feedback(&id)
    };

    match outcome {
        Ok(candidate) => (StatusCode::OK, Json(candidate)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn view_handler<N, C>(
    State(service): SharedService<N, C>,
    Path(stage_id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let (filter, sort) = query.specs();
    match service.query_view(&StageId(stage_id), &filter, &sort) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn metrics_handler<N, C>(State(service): SharedService<N, C>) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let response = MetricsResponse {
        metrics: service.metrics(),
        stages: service.stage_summaries(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

pub(crate) async fn bulk_handler<N, C>(
    State(service): SharedService<N, C>,
    Json(request): Json<BulkRequest>,
) -> Json<BulkResult>
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    Json(service.apply_bulk(&request.action, request.candidate_ids))
}

pub(crate) async fn selection_handler<N, C>(State(service): SharedService<N, C>) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let payload = json!({ "selected": service.selected_ids() });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn toggle_handler<N, C>(
    State(service): SharedService<N, C>,
    Path(candidate_id): Path<String>,
) -> Response
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let id = CandidateId(candidate_id);
    let selected = service.toggle_selection(&id);
    let payload = json!({
        "candidate_id": id,
        "selected": selected,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn apply_selection_handler<N, C>(
    State(service): SharedService<N, C>,
    Json(action): Json<BulkAction>,
) -> Json<BulkResult>
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    Json(service.apply_to_selection(&action))
}
