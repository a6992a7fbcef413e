use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::pipeline::clock::FixedClock;
use crate::workflows::pipeline::domain::{
    Candidate, CandidateId, CandidateImport, Priority, Stage, StageId, StageStatus,
};
use crate::workflows::pipeline::notify::{
    NotificationKind, NotificationSink, NotifyError, PipelineNotification,
};
use crate::workflows::pipeline::registry::StageRegistry;
use crate::workflows::pipeline::service::PipelineService;

pub(super) type TestService = PipelineService<MemoryNotifications, FixedClock>;

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
}

pub(super) fn stage(
    id: &str,
    order: u32,
    status: StageStatus,
    target_days: u32,
    requires_feedback: bool,
) -> Stage {
    Stage {
        id: StageId::new(id),
        order,
        name: id.replace('_', " "),
        status,
        avg_time_target_days: target_days,
        requires_feedback,
        ai_supported: false,
        interview: false,
    }
}

/// Applied -> Qualified -> Interview, where Interview gates on feedback.
pub(super) fn scenario_registry() -> Arc<StageRegistry> {
    let mut interview = stage("interview", 2, StageStatus::Warning, 7, true);
    interview.interview = true;
    let stages = vec![
        stage("applied", 0, StageStatus::Healthy, 3, false),
        stage("qualified", 1, StageStatus::Healthy, 5, false),
        interview,
    ];
    Arc::new(StageRegistry::new(stages).expect("scenario catalog is valid"))
}

pub(super) fn standard_registry() -> Arc<StageRegistry> {
    Arc::new(StageRegistry::standard().expect("standard catalog is valid"))
}

pub(super) fn build_service() -> (TestService, Arc<MemoryNotifications>, Arc<FixedClock>) {
    build_service_with(scenario_registry())
}

pub(super) fn build_service_with(
    registry: Arc<StageRegistry>,
) -> (TestService, Arc<MemoryNotifications>, Arc<FixedClock>) {
    let notifications = Arc::new(MemoryNotifications::default());
    let clock = Arc::new(FixedClock::new(start()));
    let service = PipelineService::new(registry, notifications.clone(), clock.clone());
    (service, notifications, clock)
}

pub(super) fn import(id: &str, name: &str, stage_id: &str) -> CandidateImport {
    CandidateImport {
        id: Some(CandidateId::new(id)),
        name: name.to_string(),
        position: "Backend Engineer".to_string(),
        stage_id: StageId::new(stage_id),
        stage_entered_at: None,
        priority: Priority::Medium,
        score: None,
        tags: Vec::new(),
        has_notes: false,
        needs_feedback: false,
        next_action: None,
    }
}

pub(super) fn seed(service: &TestService, id: &str, name: &str, stage_id: &str) -> Candidate {
    service
        .import_candidate(import(id, name, stage_id))
        .expect("seed import succeeds")
}

/// Standalone candidate for exercising the pure view and metrics functions.
pub(super) fn candidate(id: &str, name: &str, stage_id: &str) -> Candidate {
    import(id, name, stage_id).into_candidate(CandidateId::new(id), start())
}

pub(super) fn aged(mut candidate: Candidate, days: i64) -> Candidate {
    candidate.time_in_stage = Duration::days(days);
    candidate
}

pub(super) fn ids(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(|candidate| candidate.id.as_str()).collect()
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<PipelineNotification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<PipelineNotification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }

    pub(super) fn kinds(&self) -> Vec<NotificationKind> {
        self.events().into_iter().map(|event| event.kind).collect()
    }

    pub(super) fn clear(&self) {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clear();
    }
}

impl NotificationSink for MemoryNotifications {
    fn publish(&self, notification: PipelineNotification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifications;

impl NotificationSink for OfflineNotifications {
    fn publish(&self, _notification: PipelineNotification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("relay offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
