use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::CandidateId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CandidateImported,
    CandidateMoved,
    CandidateArchived,
    FeedbackRequested,
    CandidateTagged,
    MessageQueued,
    BulkCompleted,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CandidateImported => "candidate_imported",
            Self::CandidateMoved => "candidate_moved",
            Self::CandidateArchived => "candidate_archived",
            Self::FeedbackRequested => "feedback_requested",
            Self::CandidateTagged => "candidate_tagged",
            Self::MessageQueued => "message_queued",
            Self::BulkCompleted => "bulk_completed",
        }
    }
}

/// Payload handed to the messaging subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineNotification {
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<CandidateId>,
    pub details: BTreeMap<String, String>,
}

impl PipelineNotification {
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            kind,
            candidate_id: None,
            details: BTreeMap::new(),
        }
    }

    pub fn for_candidate(kind: NotificationKind, candidate_id: &CandidateId) -> Self {
        Self {
            candidate_id: Some(candidate_id.clone()),
            ..Self::new(kind)
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Outbound hook for the messaging subsystem. Delivery is fire-and-forget:
/// callers log failures and carry on.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: PipelineNotification) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
