use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{info, warn};

use super::bulk::{BulkAction, BulkActionCoordinator, BulkEffect, BulkResult, SelectionManager};
use super::clock::Clock;
use super::domain::{
    Candidate, CandidateId, CandidateImport, ErrorKind, Stage, StageId, ValidationError,
};
use super::metrics::{self, PipelineMetrics, StageSummary};
use super::notify::{NotificationKind, NotificationSink, PipelineNotification};
use super::registry::StageRegistry;
use super::store::{CandidateStore, StoreError};
use super::transition::{Destination, Move, Transition, TransitionError, TransitionStateMachine};
use super::view::{self, FilterSpec, SortSpec};

/// Facade over the pipeline engine: one authoritative store, the transition
/// rules, the view/metrics computations, and the selection of the operator's
/// current view.
pub struct PipelineService<N, C> {
    registry: Arc<StageRegistry>,
    store: Arc<CandidateStore>,
    machine: TransitionStateMachine,
    notifications: Arc<N>,
    clock: Arc<C>,
    selection: Mutex<SelectionManager>,
    sequence: AtomicU64,
}

impl<N, C> PipelineService<N, C>
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    pub fn new(registry: Arc<StageRegistry>, notifications: Arc<N>, clock: Arc<C>) -> Self {
        let store = Arc::new(CandidateStore::new(registry));
        Self::with_store(store, notifications, clock)
    }

    pub fn with_store(store: Arc<CandidateStore>, notifications: Arc<N>, clock: Arc<C>) -> Self {
        let registry = store.registry().clone();
        let machine = TransitionStateMachine::new(registry.clone());

        Self {
            registry,
            store,
            machine,
            notifications,
            clock,
            selection: Mutex::new(SelectionManager::new()),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    pub fn store(&self) -> &CandidateStore {
        &self.store
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.registry.ordered().to_vec()
    }

    /// Ingest one candidate from the applicant-tracking feed. An existing id
    /// is replaced in place.
    pub fn import_candidate(
        &self,
        import: CandidateImport,
    ) -> Result<Candidate, PipelineServiceError> {
        import.validate()?;
        if !self.registry.contains(&import.stage_id) {
            return Err(ValidationError::UnknownStage(import.stage_id).into());
        }

        let now = self.clock.now();
        let id = match &import.id {
            Some(id) => id.clone(),
            None => self.next_candidate_id(),
        };
        let stored = self.store.upsert(import.into_candidate(id, now), now)?;

        info!(candidate = %stored.id, stage = %stored.stage_id, "candidate imported");
        self.notify(
            PipelineNotification::for_candidate(NotificationKind::CandidateImported, &stored.id)
                .with_detail("stage_id", stored.stage_id.as_str()),
        );

        Ok(stored)
    }

    /// Import each entry independently; rows are numbered from 1.
    pub fn import_batch<I>(&self, imports: I) -> ImportSummary
    where
        I: IntoIterator<Item = CandidateImport>,
    {
        let mut summary = ImportSummary::default();
        for (index, import) in imports.into_iter().enumerate() {
            match self.import_candidate(import) {
                Ok(candidate) => summary.imported.push(candidate.id),
                Err(err) => {
                    summary.rejected.insert(index + 1, err.to_string());
                }
            }
        }
        summary
    }

    pub fn get(&self, id: &CandidateId) -> Result<Candidate, PipelineServiceError> {
        Ok(self.store.get(id, self.clock.now())?)
    }

    pub fn move_candidate(
        &self,
        id: &CandidateId,
        requested: Move,
    ) -> Result<Candidate, TransitionError> {
        let transition = self
            .machine
            .apply(&self.store, id, &requested, self.clock.now())?;
        self.announce(&transition);
        Ok(transition.candidate)
    }

    /// Mark the outstanding evaluation as recorded, opening the feedback gate.
    pub fn record_feedback(&self, id: &CandidateId) -> Result<Candidate, PipelineServiceError> {
        let candidate = self.store.update(id, self.clock.now(), |candidate| {
            candidate.needs_feedback = false;
            Ok::<(), StoreError>(())
        })?;
        info!(candidate = %id, "feedback recorded");
        Ok(candidate)
    }

    pub fn request_feedback(&self, id: &CandidateId) -> Result<Candidate, PipelineServiceError> {
        let candidate = self.store.update(id, self.clock.now(), |candidate| {
            candidate.needs_feedback = true;
            Ok::<(), StoreError>(())
        })?;
        self.notify(
            PipelineNotification::for_candidate(NotificationKind::FeedbackRequested, id)
                .with_detail("stage_id", candidate.stage_id.as_str()),
        );
        Ok(candidate)
    }

    /// Filtered, ordered view of one stage. The result also becomes the scope
    /// of the operator's selection.
    pub fn query_view(
        &self,
        stage_id: &StageId,
        filter: &FilterSpec,
        sort: &SortSpec,
    ) -> Result<Vec<Candidate>, PipelineServiceError> {
        let candidates = self.store.list_by_stage(stage_id, self.clock.now())?;
        let view = view::apply(&candidates, filter, sort);
        self.selection().show(stage_id, &view);
        Ok(view)
    }

    pub fn metrics(&self) -> PipelineMetrics {
        let candidates = self.store.active(self.clock.now());
        metrics::compute(&self.registry, &candidates)
    }

    pub fn stage_summaries(&self) -> Vec<StageSummary> {
        let candidates = self.store.active(self.clock.now());
        metrics::stage_summaries(&self.registry, &candidates)
    }

    pub fn toggle_selection(&self, id: &CandidateId) -> bool {
        self.selection().toggle(id)
    }

    pub fn select_all(&self) {
        self.selection().select_all();
    }

    pub fn clear_selection(&self) {
        self.selection().clear();
    }

    pub fn selected_ids(&self) -> Vec<CandidateId> {
        self.selection().selected().iter().cloned().collect()
    }

    /// Apply `action` to every id independently. Earlier successes stand when
    /// later candidates fail, and the selection is cleared either way.
    pub fn apply_bulk<I>(&self, action: &BulkAction, ids: I) -> BulkResult
    where
        I: IntoIterator<Item = CandidateId>,
    {
        let run = BulkActionCoordinator::new(&self.machine, &self.store).apply(
            action,
            ids,
            self.clock.now(),
        );
        self.selection().clear();

        for effect in &run.effects {
            match effect {
                BulkEffect::Transitioned(transition) => self.announce(transition),
                BulkEffect::Tagged {
                    candidate,
                    tag,
                    message,
                } => {
                    self.notify(
                        PipelineNotification::for_candidate(
                            NotificationKind::CandidateTagged,
                            &candidate.id,
                        )
                        .with_detail("tag", tag.as_str()),
                    );
                    if let Some(body) = message {
                        self.notify(
                            PipelineNotification::for_candidate(
                                NotificationKind::MessageQueued,
                                &candidate.id,
                            )
                            .with_detail("message", body.as_str()),
                        );
                    }
                }
            }
        }

        let result = run.result;
        info!(
            action = action.label(),
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "bulk action completed"
        );
        self.notify(
            PipelineNotification::new(NotificationKind::BulkCompleted)
                .with_detail("action", action.label())
                .with_detail("succeeded", result.succeeded.len().to_string())
                .with_detail("failed", result.failed.len().to_string()),
        );

        result
    }

    pub fn apply_to_selection(&self, action: &BulkAction) -> BulkResult {
        let ids = self.selected_ids();
        self.apply_bulk(action, ids)
    }

    fn announce(&self, transition: &Transition) {
        let id = &transition.candidate.id;
        match &transition.to {
            Destination::Stage(stage_id) => {
                self.notify(
                    PipelineNotification::for_candidate(NotificationKind::CandidateMoved, id)
                        .with_detail("from", transition.from.as_str())
                        .with_detail("to", stage_id.as_str()),
                );
                let collects_feedback = self
                    .registry
                    .get(stage_id)
                    .map(|stage| stage.requires_feedback)
                    .unwrap_or(false);
                if collects_feedback {
                    self.notify(
                        PipelineNotification::for_candidate(NotificationKind::FeedbackRequested, id)
                            .with_detail("stage_id", stage_id.as_str()),
                    );
                }
            }
            Destination::Archived => self.notify(
                PipelineNotification::for_candidate(NotificationKind::CandidateArchived, id)
                    .with_detail("from", transition.from.as_str()),
            ),
        }
    }

    fn notify(&self, notification: PipelineNotification) {
        let kind = notification.kind;
        if let Err(err) = self.notifications.publish(notification) {
            warn!(kind = kind.label(), error = %err, "notification dropped");
        }
    }

    fn next_candidate_id(&self) -> CandidateId {
        loop {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            let id = CandidateId(format!("cand-{sequence:06}"));
            if !self.store.contains(&id) {
                return id;
            }
        }
    }

    fn selection(&self) -> MutexGuard<'_, SelectionManager> {
        self.selection.lock().expect("selection mutex poisoned")
    }
}

/// Outcome of a multi-row import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: Vec<CandidateId>,
    pub rejected: BTreeMap<usize, String>,
}

/// Error raised by the pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum PipelineServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl PipelineServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineServiceError::Validation(_) => ErrorKind::Validation,
            PipelineServiceError::Store(err) => err.kind(),
            PipelineServiceError::Transition(err) => err.kind(),
        }
    }
}
