use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use super::domain::{Candidate, CandidateId, ErrorKind, StageId, ValidationError};
use super::registry::StageRegistry;
use super::transition::{Destination, Transition, TransitionError};

/// Authoritative in-memory candidate state.
///
/// Writes are serialized behind a single `RwLock`; every read clones out a
/// snapshot with `time_in_stage`/`is_overdue` recomputed for the supplied
/// instant, so readers never observe a half-applied mutation. Active
/// candidates are indexed by stage; archived candidates stay addressable by id
/// but belong to no stage.
#[derive(Debug)]
pub struct CandidateStore {
    registry: Arc<StageRegistry>,
    overdue_grace: Duration,
    state: RwLock<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    candidates: BTreeMap<CandidateId, Candidate>,
    by_stage: BTreeMap<StageId, BTreeSet<CandidateId>>,
}

impl StoreState {
    fn attach(&mut self, candidate: &Candidate) {
        if candidate.is_archived() {
            return;
        }
        self.by_stage
            .entry(candidate.stage_id.clone())
            .or_default()
            .insert(candidate.id.clone());
    }

    fn detach(&mut self, candidate: &Candidate) {
        if let Some(members) = self.by_stage.get_mut(&candidate.stage_id) {
            members.remove(&candidate.id);
        }
    }

    fn active_len(&self) -> usize {
        self.candidates
            .values()
            .filter(|candidate| !candidate.is_archived())
            .count()
    }

    /// Every active candidate is indexed under exactly one stage.
    fn is_consistent(&self) -> bool {
        let indexed: usize = self.by_stage.values().map(BTreeSet::len).sum();
        indexed == self.active_len()
            && self.by_stage.iter().all(|(stage_id, members)| {
                members.iter().all(|id| {
                    self.candidates
                        .get(id)
                        .map(|candidate| &candidate.stage_id == stage_id && !candidate.is_archived())
                        .unwrap_or(false)
                })
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("candidate '{0}' not found")]
    NotFound(CandidateId),
    #[error("stage '{0}' not found")]
    StageNotFound(StageId),
    #[error("candidate '{0}' is archived")]
    Archived(CandidateId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) | StoreError::StageNotFound(_) => ErrorKind::NotFound,
            StoreError::Archived(_) => ErrorKind::TerminalState,
            StoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

impl CandidateStore {
    pub fn new(registry: Arc<StageRegistry>) -> Self {
        Self {
            registry,
            overdue_grace: Duration::zero(),
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Extra slack added to every stage target before a candidate is overdue.
    pub fn with_overdue_grace(mut self, grace: Duration) -> Self {
        self.overdue_grace = grace.max(Duration::zero());
        self
    }

    pub fn registry(&self) -> &Arc<StageRegistry> {
        &self.registry
    }

    pub fn get(&self, id: &CandidateId, now: DateTime<Utc>) -> Result<Candidate, StoreError> {
        let state = self.read_state();
        state
            .candidates
            .get(id)
            .map(|candidate| self.observe(candidate, now))
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.read_state().candidates.contains_key(id)
    }

    /// Active candidates in `stage_id`, ascending by id.
    pub fn list_by_stage(
        &self,
        stage_id: &StageId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Candidate>, StoreError> {
        if !self.registry.contains(stage_id) {
            return Err(StoreError::StageNotFound(stage_id.clone()));
        }

        let state = self.read_state();
        let members = match state.by_stage.get(stage_id) {
            Some(members) => members,
            None => return Ok(Vec::new()),
        };

        Ok(members
            .iter()
            .filter_map(|id| state.candidates.get(id))
            .map(|candidate| self.observe(candidate, now))
            .collect())
    }

    /// Every candidate, archived included, ascending by id.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<Candidate> {
        let state = self.read_state();
        state
            .candidates
            .values()
            .map(|candidate| self.observe(candidate, now))
            .collect()
    }

    pub fn active(&self, now: DateTime<Utc>) -> Vec<Candidate> {
        let state = self.read_state();
        state
            .candidates
            .values()
            .filter(|candidate| !candidate.is_archived())
            .map(|candidate| self.observe(candidate, now))
            .collect()
    }

    /// Insert or replace an active candidate. The stage must resolve in the
    /// registry and archived records cannot be replaced. Archiving only
    /// happens through `set_stage`.
    pub fn upsert(&self, mut candidate: Candidate, now: DateTime<Utc>) -> Result<Candidate, StoreError> {
        if candidate.is_archived() {
            return Err(ValidationError::AlreadyArchived(candidate.id).into());
        }
        if !self.registry.contains(&candidate.stage_id) {
            return Err(ValidationError::UnknownStage(candidate.stage_id).into());
        }

        let mut state = self.write_state();
        let previous = state.candidates.get(&candidate.id).cloned();
        if let Some(previous) = previous {
            if previous.is_archived() {
                return Err(StoreError::Archived(previous.id));
            }
            state.detach(&previous);
        }

        candidate.refresh(self.overdue_threshold(&candidate.stage_id), now);
        state.attach(&candidate);
        state
            .candidates
            .insert(candidate.id.clone(), candidate.clone());
        debug_assert!(state.is_consistent());

        Ok(candidate)
    }

    /// Stage-change primitive. `guard` sees the current record under the write
    /// lock and picks the destination; the move resets the stage clock, and
    /// `needs_feedback` survives only when the destination stage collects
    /// feedback.
    pub(crate) fn set_stage<F>(
        &self,
        id: &CandidateId,
        now: DateTime<Utc>,
        guard: F,
    ) -> Result<Transition, TransitionError>
    where
        F: FnOnce(&Candidate) -> Result<Destination, TransitionError>,
    {
        let mut state = self.write_state();
        let current = state
            .candidates
            .get(id)
            .map(|candidate| self.observe(candidate, now))
            .ok_or_else(|| TransitionError::NotFound(id.clone()))?;

        let destination = guard(&current)?;
        let mut updated = current.clone();

        match &destination {
            Destination::Stage(stage_id) => {
                let requires_feedback = self
                    .registry
                    .get(stage_id)
                    .map(|stage| stage.requires_feedback)
                    .ok_or_else(|| ValidationError::UnknownStage(stage_id.clone()))?;
                updated.stage_id = stage_id.clone();
                if !requires_feedback {
                    updated.needs_feedback = false;
                }
            }
            Destination::Archived => {
                updated.archived_at = Some(now);
                updated.needs_feedback = false;
            }
        }

        updated.stage_entered_at = now;
        updated.refresh(self.overdue_threshold(&updated.stage_id), now);

        state.detach(&current);
        state.attach(&updated);
        state.candidates.insert(id.clone(), updated.clone());
        debug_assert!(state.is_consistent());

        Ok(Transition {
            from: current.stage_id,
            to: destination,
            candidate: updated,
        })
    }

    /// Attribute edit that never changes stage membership. Archived
    /// candidates are rejected.
    pub(crate) fn update<F, E>(&self, id: &CandidateId, now: DateTime<Utc>, edit: F) -> Result<Candidate, E>
    where
        F: FnOnce(&mut Candidate) -> Result<(), E>,
        E: From<StoreError>,
    {
        let mut state = self.write_state();
        let mut candidate = state
            .candidates
            .get(id)
            .map(|candidate| self.observe(candidate, now))
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if candidate.is_archived() {
            return Err(StoreError::Archived(id.clone()).into());
        }

        let stage_id = candidate.stage_id.clone();
        let entered_at = candidate.stage_entered_at;
        edit(&mut candidate)?;
        candidate.stage_id = stage_id;
        candidate.stage_entered_at = entered_at;
        candidate.refresh(self.overdue_threshold(&candidate.stage_id), now);

        state.candidates.insert(id.clone(), candidate.clone());
        Ok(candidate)
    }

    pub fn len(&self) -> usize {
        self.read_state().candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_len(&self) -> usize {
        self.read_state().active_len()
    }

    pub fn archived_len(&self) -> usize {
        let state = self.read_state();
        state.candidates.len() - state.active_len()
    }

    /// Active candidate count for every catalog stage, zero included.
    pub fn stage_counts(&self) -> BTreeMap<StageId, usize> {
        let state = self.read_state();
        self.registry
            .ordered()
            .iter()
            .map(|stage| {
                let count = state.by_stage.get(&stage.id).map_or(0, BTreeSet::len);
                (stage.id.clone(), count)
            })
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        self.read_state().is_consistent()
    }

    fn overdue_threshold(&self, stage_id: &StageId) -> Duration {
        let target = self
            .registry
            .get(stage_id)
            .map(|stage| stage.avg_time_target())
            .unwrap_or_else(Duration::zero);
        target + self.overdue_grace
    }

    fn observe(&self, candidate: &Candidate, now: DateTime<Utc>) -> Candidate {
        let mut observed = candidate.clone();
        observed.refresh(self.overdue_threshold(&observed.stage_id), now);
        observed
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().expect("candidate store lock poisoned")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().expect("candidate store lock poisoned")
    }
}
