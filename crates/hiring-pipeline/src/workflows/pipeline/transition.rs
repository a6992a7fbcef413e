use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{Candidate, CandidateId, ErrorKind, StageId, ValidationError};
use super::registry::StageRegistry;
use super::store::CandidateStore;

/// Requested stage change for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum Move {
    /// Advance to the next stage in order, subject to the feedback gate.
    Forward,
    /// Send back to the immediately preceding stage.
    Backward,
    /// Jump to a named stage: the next stage (gated) or any earlier one.
    To { stage_id: StageId },
    Archive,
}

/// Where a validated transition lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Stage(StageId),
    Archived,
}

/// Outcome of an applied transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: StageId,
    pub to: Destination,
    pub candidate: Candidate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("candidate '{0}' not found")]
    NotFound(CandidateId),
    #[error("candidate '{candidate_id}' needs recorded feedback before leaving '{stage_id}'")]
    FeedbackRequired {
        candidate_id: CandidateId,
        stage_id: StageId,
    },
    #[error("candidate '{0}' is archived and accepts no further transitions")]
    TerminalState(CandidateId),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl TransitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransitionError::NotFound(_) => ErrorKind::NotFound,
            TransitionError::FeedbackRequired { .. } => ErrorKind::FeedbackRequired,
            TransitionError::TerminalState(_) => ErrorKind::TerminalState,
            TransitionError::Invalid(_) => ErrorKind::Validation,
        }
    }
}

/// Validates stage moves against the catalog order.
///
/// The states are the catalog stages plus an absorbing `Archived` state.
/// Forward edges are gated on feedback: leaving a stage that requires feedback
/// while the candidate still `needs_feedback` fails. Backward edges and
/// archiving are always allowed.
#[derive(Debug, Clone)]
pub struct TransitionStateMachine {
    registry: Arc<StageRegistry>,
}

impl TransitionStateMachine {
    pub fn new(registry: Arc<StageRegistry>) -> Self {
        Self { registry }
    }

    /// Decide where `requested` takes `candidate` without touching any state.
    pub fn plan(&self, candidate: &Candidate, requested: &Move) -> Result<Destination, TransitionError> {
        if candidate.is_archived() {
            return Err(TransitionError::TerminalState(candidate.id.clone()));
        }

        let current = &candidate.stage_id;
        let position = self
            .registry
            .position(current)
            .ok_or_else(|| ValidationError::UnknownStage(current.clone()))?;

        match requested {
            Move::Archive => Ok(Destination::Archived),
            Move::Forward => self.advance(candidate),
            Move::Backward => self
                .registry
                .previous(current)
                .map(|stage| Destination::Stage(stage.id.clone()))
                .ok_or_else(|| ValidationError::NoPreviousStage(current.clone()).into()),
            Move::To { stage_id } => {
                let target = self
                    .registry
                    .position(stage_id)
                    .ok_or_else(|| ValidationError::UnknownStage(stage_id.clone()))?;

                if target == position {
                    Err(ValidationError::SameStage(current.clone()).into())
                } else if target < position {
                    Ok(Destination::Stage(stage_id.clone()))
                } else if target == position + 1 {
                    self.advance(candidate)
                } else {
                    Err(ValidationError::SkipAhead {
                        from: current.clone(),
                        to: stage_id.clone(),
                    }
                    .into())
                }
            }
        }
    }

    /// Send a candidate back to `target`, which must be strictly earlier.
    pub fn plan_send_back(
        &self,
        candidate: &Candidate,
        target: &StageId,
    ) -> Result<Destination, TransitionError> {
        if candidate.is_archived() {
            return Err(TransitionError::TerminalState(candidate.id.clone()));
        }

        let current = self
            .registry
            .position(&candidate.stage_id)
            .ok_or_else(|| ValidationError::UnknownStage(candidate.stage_id.clone()))?;
        let target_position = self
            .registry
            .position(target)
            .ok_or_else(|| ValidationError::UnknownStage(target.clone()))?;

        if target_position < current {
            Ok(Destination::Stage(target.clone()))
        } else {
            Err(ValidationError::NotEarlier {
                current: candidate.stage_id.clone(),
                target: target.clone(),
            }
            .into())
        }
    }

    /// Validate and apply `requested` atomically against the store.
    pub fn apply(
        &self,
        store: &CandidateStore,
        id: &CandidateId,
        requested: &Move,
        now: DateTime<Utc>,
    ) -> Result<Transition, TransitionError> {
        self.commit(store, id, now, |machine, candidate| {
            machine.plan(candidate, requested)
        })
    }

    pub fn send_back(
        &self,
        store: &CandidateStore,
        id: &CandidateId,
        target: &StageId,
        now: DateTime<Utc>,
    ) -> Result<Transition, TransitionError> {
        self.commit(store, id, now, |machine, candidate| {
            machine.plan_send_back(candidate, target)
        })
    }

    fn commit<F>(
        &self,
        store: &CandidateStore,
        id: &CandidateId,
        now: DateTime<Utc>,
        decide: F,
    ) -> Result<Transition, TransitionError>
    where
        F: FnOnce(&Self, &Candidate) -> Result<Destination, TransitionError>,
    {
        let result = store.set_stage(id, now, |candidate| decide(self, candidate));

        match &result {
            Ok(transition) => info!(
                candidate = %id,
                from = %transition.from,
                to = ?transition.to,
                "candidate transitioned"
            ),
            Err(err) => warn!(
                candidate = %id,
                kind = err.kind().label(),
                error = %err,
                "transition rejected"
            ),
        }

        result
    }

    fn advance(&self, candidate: &Candidate) -> Result<Destination, TransitionError> {
        let current = self
            .registry
            .get(&candidate.stage_id)
            .ok_or_else(|| ValidationError::UnknownStage(candidate.stage_id.clone()))?;

        // The gate is checked first: a pending evaluation blocks even the last
        // stage, where there is nowhere further to go.
        if current.requires_feedback && candidate.needs_feedback {
            return Err(TransitionError::FeedbackRequired {
                candidate_id: candidate.id.clone(),
                stage_id: current.id.clone(),
            });
        }

        self.registry
            .next(&current.id)
            .map(|next| Destination::Stage(next.id.clone()))
            .ok_or_else(|| ValidationError::NoNextStage(current.id.clone()).into())
    }
}
