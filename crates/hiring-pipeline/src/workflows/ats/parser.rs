use std::collections::BTreeSet;
use std::io::Read;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::workflows::pipeline::domain::{
    CandidateId, CandidateImport, Priority, StageId, MAX_SCORE,
};

/// One data row of the feed, numbered from 1 after the header.
#[derive(Debug)]
pub(crate) struct ParsedRow {
    pub(crate) row: usize,
    pub(crate) outcome: Result<CandidateImport, AtsRowError>,
}

/// Problem with a single feed row. The rest of the feed is still imported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AtsRowError {
    #[error("malformed row: {0}")]
    Malformed(String),
    #[error("missing value for '{0}'")]
    MissingField(&'static str),
    #[error("unknown priority '{0}'")]
    InvalidPriority(String),
    #[error("score '{0}' is not a whole number from 0 to 100")]
    InvalidScore(String),
    #[error("'{value}' is not a yes/no value for '{field}'")]
    InvalidBoolean { field: &'static str, value: String },
    #[error("unrecognised timestamp '{0}'")]
    InvalidTimestamp(String),
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.headers()?;

    let mut rows = Vec::new();
    for (index, record) in csv_reader.deserialize::<AtsRow>().enumerate() {
        let outcome = match record {
            Ok(row) => row.into_import(),
            Err(err) if err.is_io_error() => return Err(err),
            Err(err) => Err(AtsRowError::Malformed(err.to_string())),
        };
        rows.push(ParsedRow {
            row: index + 1,
            outcome,
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct AtsRow {
    #[serde(
        rename = "Candidate ID",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    candidate_id: Option<String>,
    #[serde(rename = "Name", default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(rename = "Position", default, deserialize_with = "empty_string_as_none")]
    position: Option<String>,
    #[serde(rename = "Stage", default, deserialize_with = "empty_string_as_none")]
    stage: Option<String>,
    #[serde(
        rename = "Entered Stage At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    entered_stage_at: Option<String>,
    #[serde(rename = "Priority", default, deserialize_with = "empty_string_as_none")]
    priority: Option<String>,
    #[serde(rename = "Score", default, deserialize_with = "empty_string_as_none")]
    score: Option<String>,
    #[serde(rename = "Tags", default, deserialize_with = "empty_string_as_none")]
    tags: Option<String>,
    #[serde(rename = "Has Notes", default, deserialize_with = "empty_string_as_none")]
    has_notes: Option<String>,
    #[serde(
        rename = "Needs Feedback",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    needs_feedback: Option<String>,
    #[serde(
        rename = "Next Action",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    next_action: Option<String>,
}

impl AtsRow {
    fn into_import(self) -> Result<CandidateImport, AtsRowError> {
        let name = self.name.ok_or(AtsRowError::MissingField("Name"))?;
        let position = self.position.ok_or(AtsRowError::MissingField("Position"))?;
        let stage = self.stage.ok_or(AtsRowError::MissingField("Stage"))?;

        let priority = match self.priority.as_deref() {
            Some(raw) => Priority::parse(raw).ok_or_else(|| AtsRowError::InvalidPriority(raw.to_string()))?,
            None => Priority::default(),
        };
        let score = match self.score.as_deref() {
            Some(raw) => Some(
                raw.parse::<u8>()
                    .ok()
                    .filter(|score| *score <= MAX_SCORE)
                    .ok_or_else(|| AtsRowError::InvalidScore(raw.to_string()))?,
            ),
            None => None,
        };
        let stage_entered_at = match self.entered_stage_at.as_deref() {
            Some(raw) => {
                Some(parse_timestamp(raw).ok_or_else(|| AtsRowError::InvalidTimestamp(raw.to_string()))?)
            }
            None => None,
        };

        Ok(CandidateImport {
            id: self.candidate_id.map(CandidateId),
            name,
            position,
            stage_id: normalize_stage(&stage),
            stage_entered_at,
            priority,
            score,
            tags: split_tags(self.tags.as_deref()),
            has_notes: parse_flag("Has Notes", self.has_notes.as_deref())?,
            needs_feedback: parse_flag("Needs Feedback", self.needs_feedback.as_deref())?,
            next_action: self.next_action,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

/// Feed exports use display labels ("Phone Screen"); the catalog uses
/// snake_case ids.
pub(crate) fn normalize_stage(raw: &str) -> StageId {
    let id = raw
        .trim()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    StageId(id)
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    let unique: BTreeSet<String> = raw
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    unique.into_iter().collect()
}

fn parse_flag(field: &'static str, raw: Option<&str>) -> Result<bool, AtsRowError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        _ => Err(AtsRowError::InvalidBoolean {
            field,
            value: raw.to_string(),
        }),
    }
}

/// RFC 3339, or a bare `YYYY-MM-DD` read as midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
