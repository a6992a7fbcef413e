//! Filtering and ordering of a stage's candidates for display.
//!
//! [`apply`] never mutates its input; it returns a fresh, deterministically
//! ordered sequence, so feeding a view back through with the same specs
//! returns it unchanged.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::domain::{Candidate, Priority};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Overdue,
    HighPriority,
    NeedsFeedback,
}

impl StatusFilter {
    pub fn matches(self, candidate: &Candidate) -> bool {
        match self {
            Self::All => true,
            Self::Overdue => candidate.is_overdue,
            Self::HighPriority => candidate.priority == Priority::High,
            Self::NeedsFeedback => candidate.needs_feedback,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Case-insensitive substring matched against name or position.
    #[serde(default)]
    pub search_text: String,
    #[serde(default)]
    pub status: StatusFilter,
}

impl FilterSpec {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.status.matches(candidate) && matches_search(&self.search_text, candidate)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Priority,
    TimeInStage,
    Score,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default)]
    pub key: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Primary key in the requested direction, then name ascending, then id.
    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        let primary = match self.key {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Priority => a.priority.weight().cmp(&b.priority.weight()),
            SortKey::TimeInStage => a.time_in_stage.cmp(&b.time_in_stage),
            SortKey::Score => a.effective_score().cmp(&b.effective_score()),
        };

        let primary = match self.direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };

        primary
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    }
}

pub fn apply(candidates: &[Candidate], filter: &FilterSpec, sort: &SortSpec) -> Vec<Candidate> {
    let mut view: Vec<Candidate> = candidates
        .iter()
        .filter(|candidate| filter.matches(candidate))
        .cloned()
        .collect();
    view.sort_by(|a, b| sort.compare(a, b));
    view
}

fn matches_search(needle: &str, candidate: &Candidate) -> bool {
    if needle.is_empty() {
        return true;
    }
    let needle = needle.to_lowercase();
    candidate.name.to_lowercase().contains(&needle)
        || candidate.position.to_lowercase().contains(&needle)
}
