use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Identifier wrapper for catalog stages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(pub String);

impl StageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for candidates. Ordering is plain lexicographic and
/// drives the processing order of bulk actions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operational health signal configured per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Healthy,
    Warning,
    Critical,
}

impl StageStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }

    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const fn ordered() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }

    /// Ordinal used for sorting.
    pub const fn weight(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|priority| priority.label().eq_ignore_ascii_case(raw))
    }
}

/// Immutable catalog entry describing one hiring step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub order: u32,
    pub name: String,
    pub status: StageStatus,
    /// Baseline number of days a candidate is expected to spend here.
    pub avg_time_target_days: u32,
    pub requires_feedback: bool,
    pub ai_supported: bool,
    /// Marks the stage whose population counts as active interviews.
    #[serde(default)]
    pub interview: bool,
}

impl Stage {
    pub fn avg_time_target(&self) -> Duration {
        Duration::days(i64::from(self.avg_time_target_days))
    }
}

/// A candidate as seen by readers. `time_in_stage` and `is_overdue` are
/// recomputed from `stage_entered_at` on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub position: String,
    pub stage_id: StageId,
    pub stage_entered_at: DateTime<Utc>,
    #[serde(with = "duration_seconds", rename = "time_in_stage_secs")]
    pub time_in_stage: Duration,
    pub priority: Priority,
    pub score: Option<u8>,
    pub tags: BTreeSet<String>,
    pub has_notes: bool,
    pub needs_feedback: bool,
    pub is_overdue: bool,
    pub next_action: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn time_in_stage_days(&self) -> f64 {
        self.time_in_stage.num_seconds() as f64 / SECONDS_PER_DAY
    }

    /// Score used for comparisons; unevaluated candidates count as zero.
    pub fn effective_score(&self) -> u8 {
        self.score.unwrap_or(0)
    }

    pub(crate) fn refresh(&mut self, overdue_threshold: Duration, now: DateTime<Utc>) {
        self.time_in_stage = (now - self.stage_entered_at).max(Duration::zero());
        self.is_overdue = !self.is_archived() && self.time_in_stage > overdue_threshold;
    }
}

/// Ingestion payload from the applicant-tracking feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateImport {
    /// External identifier; one is assigned when the feed omits it.
    #[serde(default)]
    pub id: Option<CandidateId>,
    pub name: String,
    pub position: String,
    pub stage_id: StageId,
    #[serde(default)]
    pub stage_entered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub has_notes: bool,
    #[serde(default)]
    pub needs_feedback: bool,
    #[serde(default)]
    pub next_action: Option<String>,
}

impl CandidateImport {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankField("name"));
        }
        if self.position.trim().is_empty() {
            return Err(ValidationError::BlankField("position"));
        }
        if let Some(id) = &self.id {
            if id.as_str().trim().is_empty() {
                return Err(ValidationError::BlankField("id"));
            }
        }
        if let Some(score) = self.score {
            if score > MAX_SCORE {
                return Err(ValidationError::ScoreOutOfRange(score));
            }
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(ValidationError::BlankTag);
        }
        Ok(())
    }

    pub(crate) fn into_candidate(self, id: CandidateId, now: DateTime<Utc>) -> Candidate {
        Candidate {
            id,
            name: self.name.trim().to_string(),
            position: self.position.trim().to_string(),
            stage_id: self.stage_id,
            stage_entered_at: self.stage_entered_at.unwrap_or(now),
            time_in_stage: Duration::zero(),
            priority: self.priority,
            score: self.score,
            tags: self
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .collect(),
            has_notes: self.has_notes,
            needs_feedback: self.needs_feedback,
            is_overdue: false,
            next_action: self.next_action.filter(|action| !action.trim().is_empty()),
            archived_at: None,
        }
    }
}

pub const MAX_SCORE: u8 = 100;

/// Malformed input or a write that references something that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("stage '{0}' is not in the catalog")]
    UnknownStage(StageId),
    #[error("{0} must not be blank")]
    BlankField(&'static str),
    #[error("score {0} is outside 0-100")]
    ScoreOutOfRange(u8),
    #[error("tags must not be blank")]
    BlankTag,
    #[error("candidate '{0}' cannot be stored as archived; archive it through a transition")]
    AlreadyArchived(CandidateId),
    #[error("candidate is already in stage '{0}'")]
    SameStage(StageId),
    #[error("cannot skip ahead from '{from}' to '{to}'")]
    SkipAhead { from: StageId, to: StageId },
    #[error("'{target}' is not earlier than '{current}'")]
    NotEarlier { current: StageId, target: StageId },
    #[error("'{0}' is the final stage")]
    NoNextStage(StageId),
    #[error("'{0}' is the first stage")]
    NoPreviousStage(StageId),
}

/// Coarse classification shared by every pipeline error, used in bulk results
/// and HTTP payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    FeedbackRequired,
    TerminalState,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::FeedbackRequired => "feedback_required",
            Self::TerminalState => "terminal_state",
        }
    }
}

mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.num_seconds())
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn import() -> CandidateImport {
        CandidateImport {
            id: Some(CandidateId::new("c-1")),
            name: " Ada Lovelace ".to_string(),
            position: "Backend Engineer".to_string(),
            stage_id: StageId::new("applied"),
            stage_entered_at: None,
            priority: Priority::High,
            score: Some(88),
            tags: vec![" referral ".to_string()],
            has_notes: false,
            needs_feedback: false,
            next_action: Some("   ".to_string()),
        }
    }

    #[test]
    fn priority_weights_are_ordinal() {
        let weights: Vec<u8> = Priority::ordered().into_iter().map(Priority::weight).collect();
        assert_eq!(weights, vec![1, 2, 3]);
        assert_eq!(Priority::parse(" HIGH "), Some(Priority::High));
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn validate_rejects_out_of_range_score() {
        let mut dto = import();
        dto.score = Some(101);
        assert_eq!(dto.validate(), Err(ValidationError::ScoreOutOfRange(101)));
    }

    #[test]
    fn validate_rejects_blank_name() {
        let mut dto = import();
        dto.name = "   ".to_string();
        assert_eq!(dto.validate(), Err(ValidationError::BlankField("name")));
    }

    #[test]
    fn into_candidate_trims_and_defaults() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let candidate = import().into_candidate(CandidateId::new("c-1"), now);
        assert_eq!(candidate.name, "Ada Lovelace");
        assert_eq!(candidate.stage_entered_at, now);
        assert!(candidate.tags.contains("referral"));
        assert!(candidate.next_action.is_none());
    }

    #[test]
    fn refresh_marks_overdue_past_threshold() {
        let entered = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut candidate = import().into_candidate(CandidateId::new("c-1"), entered);
        candidate.refresh(Duration::days(3), entered + Duration::days(3));
        assert!(!candidate.is_overdue, "exactly at the target is not overdue");
        candidate.refresh(Duration::days(3), entered + Duration::days(4));
        assert!(candidate.is_overdue);
        assert!((candidate.time_in_stage_days() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn candidate_serializes_time_in_stage_as_seconds() {
        let entered = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut candidate = import().into_candidate(CandidateId::new("c-1"), entered);
        candidate.refresh(Duration::days(3), entered + Duration::hours(2));
        let json = serde_json::to_value(&candidate).expect("serializes");
        assert_eq!(json["time_in_stage_secs"], 7_200);
        assert_eq!(json["priority"], "high");
    }
}
