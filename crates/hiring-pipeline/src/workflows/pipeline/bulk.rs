use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Candidate, CandidateId, ErrorKind, StageId, ValidationError};
use super::store::{CandidateStore, StoreError};
use super::transition::{Move, Transition, TransitionError, TransitionStateMachine};

/// One action applied across a set of candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BulkAction {
    AdvanceStage,
    SendBack {
        stage_id: StageId,
    },
    Archive,
    /// Attach `tag`; when `message` is present, queue it for each candidate.
    TagMessage {
        tag: String,
        #[serde(default)]
        message: Option<String>,
    },
}

impl BulkAction {
    pub fn label(&self) -> &'static str {
        match self {
            BulkAction::AdvanceStage => "advance_stage",
            BulkAction::SendBack { .. } => "send_back",
            BulkAction::Archive => "archive",
            BulkAction::TagMessage { .. } => "tag_message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

/// Per-candidate outcome of a bulk action. Successes are never rolled back
/// when a later candidate fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    pub succeeded: BTreeSet<CandidateId>,
    pub failed: BTreeMap<CandidateId, BulkFailure>,
}

impl BulkResult {
    /// Some candidates succeeded and some failed.
    pub fn is_partial_failure(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure_kind(&self, id: &CandidateId) -> Option<ErrorKind> {
        self.failed.get(id).map(|failure| failure.kind)
    }

    fn fail(&mut self, id: CandidateId, kind: ErrorKind, detail: String) {
        self.failed.insert(id, BulkFailure { kind, detail });
    }
}

/// Side effect of a successful bulk step, reported back so the caller can
/// notify downstream systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkEffect {
    Transitioned(Transition),
    Tagged {
        candidate: Candidate,
        tag: String,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkRun {
    pub result: BulkResult,
    pub effects: Vec<BulkEffect>,
}

/// Multi-select state over the most recently displayed view.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    stage_id: Option<StageId>,
    visible: BTreeSet<CandidateId>,
    selected: BTreeSet<CandidateId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly rendered view. A different stage clears the
    /// selection; the same stage keeps only ids that are still visible.
    pub fn show(&mut self, stage_id: &StageId, view: &[Candidate]) {
        if self.stage_id.as_ref() != Some(stage_id) {
            self.selected.clear();
            self.stage_id = Some(stage_id.clone());
        }
        self.visible = view.iter().map(|candidate| candidate.id.clone()).collect();
        let visible = &self.visible;
        self.selected.retain(|id| visible.contains(id));
    }

    /// Flip membership. Ids outside the current view are ignored. Returns
    /// whether the id is selected afterwards.
    pub fn toggle(&mut self, id: &CandidateId) -> bool {
        if !self.visible.contains(id) {
            return false;
        }
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.visible.clone();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &CandidateId) -> bool {
        self.selected.contains(id)
    }

    pub fn selected(&self) -> &BTreeSet<CandidateId> {
        &self.selected
    }

    pub fn stage_id(&self) -> Option<&StageId> {
        self.stage_id.as_ref()
    }
}

/// Drives one action over many candidates, each independently.
pub struct BulkActionCoordinator<'a> {
    machine: &'a TransitionStateMachine,
    store: &'a CandidateStore,
}

impl<'a> BulkActionCoordinator<'a> {
    pub fn new(machine: &'a TransitionStateMachine, store: &'a CandidateStore) -> Self {
        Self { machine, store }
    }

    /// Process `ids` in ascending order. Failures are captured per id and the
    /// batch always runs to completion.
    pub fn apply<I>(&self, action: &BulkAction, ids: I, now: DateTime<Utc>) -> BulkRun
    where
        I: IntoIterator<Item = CandidateId>,
    {
        let ordered: BTreeSet<CandidateId> = ids.into_iter().collect();
        let mut run = BulkRun::default();

        for id in ordered {
            match self.apply_one(action, &id, now) {
                Ok(effect) => {
                    run.result.succeeded.insert(id);
                    run.effects.push(effect);
                }
                Err(BulkStepError::Transition(err)) => {
                    run.result.fail(id, err.kind(), err.to_string());
                }
                Err(BulkStepError::Store(err)) => {
                    run.result.fail(id, err.kind(), err.to_string());
                }
            }
        }

        run
    }

    fn apply_one(
        &self,
        action: &BulkAction,
        id: &CandidateId,
        now: DateTime<Utc>,
    ) -> Result<BulkEffect, BulkStepError> {
        let transition = match action {
            BulkAction::AdvanceStage => self.machine.apply(self.store, id, &Move::Forward, now)?,
            BulkAction::Archive => self.machine.apply(self.store, id, &Move::Archive, now)?,
            BulkAction::SendBack { stage_id } => {
                self.machine.send_back(self.store, id, stage_id, now)?
            }
            BulkAction::TagMessage { tag, message } => {
                let tag = tag.trim();
                let candidate = self.store.update(id, now, |candidate| {
                    if tag.is_empty() {
                        return Err(StoreError::Validation(ValidationError::BlankTag));
                    }
                    candidate.tags.insert(tag.to_string());
                    Ok(())
                })?;
                return Ok(BulkEffect::Tagged {
                    candidate,
                    tag: tag.to_string(),
                    message: message
                        .as_ref()
                        .map(|body| body.trim().to_string())
                        .filter(|body| !body.is_empty()),
                });
            }
        };

        Ok(BulkEffect::Transitioned(transition))
    }
}

#[derive(Debug)]
enum BulkStepError {
    Transition(TransitionError),
    Store(StoreError),
}

impl From<TransitionError> for BulkStepError {
    fn from(value: TransitionError) -> Self {
        Self::Transition(value)
    }
}

impl From<StoreError> for BulkStepError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
