use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::domain::{Stage, StageId, StageStatus};
use super::registry::StageRegistry;

/// Serialized stage configuration consumed once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCatalog {
    pub stages: Vec<Stage>,
}

impl StageCatalog {
    pub fn standard() -> Self {
        Self {
            stages: standard_stages(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn into_registry(self) -> Result<StageRegistry, CatalogError> {
        StageRegistry::new(self.stages)
    }
}

/// Narrow seam over wherever the stage configuration lives.
pub trait StageCatalogLoader {
    fn load(&self) -> Result<StageRegistry, CatalogError>;
}

/// Built-in catalog used when no file is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardCatalog;

impl StageCatalogLoader for StandardCatalog {
    fn load(&self) -> Result<StageRegistry, CatalogError> {
        StageCatalog::standard().into_registry()
    }
}

/// JSON catalog on disk.
#[derive(Debug, Clone)]
pub struct JsonCatalogFile {
    path: PathBuf,
}

impl JsonCatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StageCatalogLoader for JsonCatalogFile {
    fn load(&self) -> Result<StageRegistry, CatalogError> {
        StageCatalog::from_path(&self.path)?.into_registry()
    }
}

/// Pick the file loader when a path is configured, otherwise the standard catalog.
pub fn load_registry(path: Option<&Path>) -> Result<StageRegistry, CatalogError> {
    match path {
        Some(path) => JsonCatalogFile::new(path).load(),
        None => StandardCatalog.load(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("stage catalog is empty")]
    Empty,
    #[error("stage id must not be blank")]
    BlankId,
    #[error("stage '{0}' has a blank name")]
    BlankName(StageId),
    #[error("stage id '{0}' appears more than once")]
    DuplicateId(StageId),
    #[error("stage order {0} appears more than once")]
    DuplicateOrder(u32),
    #[error("stage orders must be contiguous: expected {expected}, found {found}")]
    NonContiguousOrder { expected: u32, found: u32 },
    #[error("stages '{0}' and '{1}' are both flagged as the interview stage")]
    MultipleInterviewStages(StageId, StageId),
    #[error("failed to read stage catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid stage catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn stage(
    id: &str,
    order: u32,
    name: &str,
    status: StageStatus,
    avg_time_target_days: u32,
) -> Stage {
    Stage {
        id: StageId::new(id),
        order,
        name: name.to_string(),
        status,
        avg_time_target_days,
        requires_feedback: false,
        ai_supported: false,
        interview: false,
    }
}

fn standard_stages() -> Vec<Stage> {
    vec![
        Stage {
            ai_supported: true,
            ..stage("applied", 0, "Applied", StageStatus::Healthy, 3)
        },
        Stage {
            ai_supported: true,
            ..stage("qualified", 1, "Qualified", StageStatus::Healthy, 5)
        },
        Stage {
            requires_feedback: true,
            ..stage("phone_screen", 2, "Phone Screen", StageStatus::Healthy, 4)
        },
        Stage {
            requires_feedback: true,
            interview: true,
            ..stage("interview", 3, "Interview", StageStatus::Warning, 7)
        },
        Stage {
            requires_feedback: true,
            ai_supported: true,
            ..stage("assessment", 4, "Assessment", StageStatus::Critical, 5)
        },
        stage("offer", 5, "Offer", StageStatus::Healthy, 3),
        stage("passed", 6, "Passed", StageStatus::Healthy, 2),
    ]
}
