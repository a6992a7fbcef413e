//! Applicant-tracking CSV feed importer.
//!
//! Expected headers: `Candidate ID, Name, Position, Stage, Entered Stage At,
//! Priority, Score, Tags, Has Notes, Needs Feedback, Next Action`. Tags are
//! `;`-separated, booleans accept yes/no/true/false/1/0, and timestamps are
//! RFC 3339 or `YYYY-MM-DD` (midnight UTC).

mod parser;

use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::workflows::pipeline::clock::Clock;
use crate::workflows::pipeline::domain::CandidateImport;
use crate::workflows::pipeline::notify::NotificationSink;
use crate::workflows::pipeline::service::{ImportSummary, PipelineService};

pub use parser::{parse_timestamp, AtsRowError};

#[derive(Debug, thiserror::Error)]
pub enum AtsImportError {
    #[error("failed to read ATS export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid ATS CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// A parsed feed: every data row, either as an import DTO or the reason it
/// could not be read.
#[derive(Debug)]
pub struct AtsFeed {
    rows: Vec<parser::ParsedRow>,
}

impl AtsFeed {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that parsed cleanly, in feed order.
    pub fn imports(&self) -> Vec<CandidateImport> {
        self.rows
            .iter()
            .filter_map(|row| row.outcome.as_ref().ok().cloned())
            .collect()
    }

    pub fn row_errors(&self) -> Vec<(usize, &AtsRowError)> {
        self.rows
            .iter()
            .filter_map(|row| row.outcome.as_ref().err().map(|err| (row.row, err)))
            .collect()
    }

    /// Import every row independently. Rejections are keyed by feed row,
    /// whether the row failed to parse or the pipeline refused it.
    pub fn import_into<N, C>(self, service: &PipelineService<N, C>) -> ImportSummary
    where
        N: NotificationSink + 'static,
        C: Clock + 'static,
    {
        let mut summary = ImportSummary::default();

        for parsed in self.rows {
            let outcome = parsed
                .outcome
                .map_err(|err| err.to_string())
                .and_then(|import| {
                    service
                        .import_candidate(import)
                        .map_err(|err| err.to_string())
                });

            match outcome {
                Ok(candidate) => summary.imported.push(candidate.id),
                Err(reason) => {
                    warn!(row = parsed.row, error = %reason, "ats row rejected");
                    summary.rejected.insert(parsed.row, reason);
                }
            }
        }

        info!(
            imported = summary.imported.len(),
            rejected = summary.rejected.len(),
            "ats feed imported"
        );
        summary
    }
}

pub struct AtsFeedImporter;

impl AtsFeedImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<AtsFeed, AtsImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<AtsFeed, AtsImportError> {
        let rows = parser::parse_rows(reader)?;
        Ok(AtsFeed { rows })
    }
}
