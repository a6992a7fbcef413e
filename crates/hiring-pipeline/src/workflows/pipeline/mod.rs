//! Recruiting pipeline engine: candidates moving through an ordered stage
//! catalog, with derived metrics, filtered views, and bulk actions.

pub mod bulk;
pub mod catalog;
pub mod clock;
pub mod domain;
pub mod metrics;
pub mod notify;
pub mod registry;
pub mod router;
pub mod service;
pub mod store;
pub mod transition;
pub mod view;

#[cfg(test)]
mod tests;

pub use bulk::{
    BulkAction, BulkActionCoordinator, BulkFailure, BulkResult, SelectionManager,
};
pub use catalog::{load_registry, CatalogError, StageCatalog, StageCatalogLoader};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    Candidate, CandidateId, CandidateImport, ErrorKind, Priority, Stage, StageId, StageStatus,
    ValidationError,
};
pub use metrics::{PipelineMetrics, StageSummary};
pub use notify::{NotificationKind, NotificationSink, NotifyError, PipelineNotification};
pub use registry::StageRegistry;
pub use router::pipeline_router;
pub use service::{ImportSummary, PipelineService, PipelineServiceError};
pub use store::{CandidateStore, StoreError};
pub use transition::{Destination, Move, Transition, TransitionError, TransitionStateMachine};
pub use view::{FilterSpec, SortDirection, SortKey, SortSpec, StatusFilter};
