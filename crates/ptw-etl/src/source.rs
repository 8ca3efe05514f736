//! Source spreadsheet reader
//!
//! Reads the denormalized project-tracking export (CSV) into memory and
//! validates that every column the transformers need is present. Values
//! stay untyped here; coercion and rejection happen in the transformers so
//! one bad cell never discards a whole file.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Columns every source export must carry.
pub const REQUIRED_COLUMNS: [&str; 21] = [
    "PROJECT_NAME",
    "PROJECT_TYPE",
    "START_DATE",
    "PLANNED_END_DATE",
    "ACTUAL_END_DATE",
    "STATUS",
    "PRIORITY",
    "OWNER",
    "PLANNED_BUDGET",
    "ACTUAL_BUDGET",
    "RISK_TYPE",
    "RISK_DESCRIPTION",
    "SEVERITY",
    "PROBABILITY",
    "MITIGATION_PLAN",
    "MILESTONE_NAME",
    "PLANNED_DATE",
    "ACTUAL_DATE",
    "DELAY_REASON",
    "DELAY_DAYS",
    "IMPACT_LEVEL",
];

/// Error types for source reading
#[derive(Debug, Error)]
pub enum SourceReadError {
    #[error("failed to read source file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to parse source row {row}: {source}")]
    MalformedRow {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("source file is missing required column {0}")]
    MissingColumn(String),
}

/// One raw row from the source export.
///
/// Empty cells are normalized to `None` before any transformer sees them.
#[derive(Debug, Clone, Default)]
pub struct SourceRow {
    pub project_name: Option<String>,
    pub project_type: Option<String>,
    pub start_date: Option<String>,
    pub planned_end_date: Option<String>,
    pub actual_end_date: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub owner: Option<String>,
    pub planned_budget: Option<String>,
    pub actual_budget: Option<String>,
    pub risk_type: Option<String>,
    pub risk_description: Option<String>,
    pub severity: Option<String>,
    pub probability: Option<String>,
    pub mitigation_plan: Option<String>,
    pub milestone_name: Option<String>,
    pub planned_date: Option<String>,
    pub actual_date: Option<String>,
    pub delay_reason: Option<String>,
    pub delay_days: Option<String>,
    pub impact_level: Option<String>,
}

/// Reader for the project-tracking CSV export
pub struct SourceReader {
    /// Maximum number of rows to read (None for unlimited)
    row_limit: Option<usize>,
}

impl SourceReader {
    /// Create a new reader with no row limit
    pub fn new() -> Self {
        Self { row_limit: None }
    }

    /// Create a reader with a row limit
    pub fn with_limit(limit: usize) -> Self {
        Self {
            row_limit: Some(limit),
        }
    }

    /// Read the export at `path` into source rows.
    ///
    /// Fails when the file is missing or unreadable, when the header lacks a
    /// required column, or when a row is structurally malformed (wrong field
    /// count, invalid encoding). Cell-level problems are not checked here.
    pub fn read(&self, path: &Path) -> Result<Vec<SourceRow>, SourceReadError> {
        info!(path = %path.display(), "Reading source export");

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| SourceReadError::Read {
                path: path.display().to_string(),
                source,
            })?;

        let headers = reader
            .headers()
            .map_err(|source| SourceReadError::Read {
                path: path.display().to_string(),
                source,
            })?
            .clone();

        let columns: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect();

        for required in REQUIRED_COLUMNS {
            if !columns.contains_key(required) {
                return Err(SourceReadError::MissingColumn(required.to_string()));
            }
        }

        let cell = |record: &csv::StringRecord, name: &str| -> Option<String> {
            record
                .get(columns[name])
                .filter(|value| !value.is_empty())
                .map(String::from)
        };

        let mut rows = Vec::new();
        for (row_index, record) in reader.records().enumerate() {
            let record = record.map_err(|source| SourceReadError::MalformedRow {
                row: row_index,
                source,
            })?;

            rows.push(SourceRow {
                project_name: cell(&record, "PROJECT_NAME"),
                project_type: cell(&record, "PROJECT_TYPE"),
                start_date: cell(&record, "START_DATE"),
                planned_end_date: cell(&record, "PLANNED_END_DATE"),
                actual_end_date: cell(&record, "ACTUAL_END_DATE"),
                status: cell(&record, "STATUS"),
                priority: cell(&record, "PRIORITY"),
                owner: cell(&record, "OWNER"),
                planned_budget: cell(&record, "PLANNED_BUDGET"),
                actual_budget: cell(&record, "ACTUAL_BUDGET"),
                risk_type: cell(&record, "RISK_TYPE"),
                risk_description: cell(&record, "RISK_DESCRIPTION"),
                severity: cell(&record, "SEVERITY"),
                probability: cell(&record, "PROBABILITY"),
                mitigation_plan: cell(&record, "MITIGATION_PLAN"),
                milestone_name: cell(&record, "MILESTONE_NAME"),
                planned_date: cell(&record, "PLANNED_DATE"),
                actual_date: cell(&record, "ACTUAL_DATE"),
                delay_reason: cell(&record, "DELAY_REASON"),
                delay_days: cell(&record, "DELAY_DAYS"),
                impact_level: cell(&record, "IMPACT_LEVEL"),
            });

            if let Some(limit) = self.row_limit {
                if rows.len() >= limit {
                    debug!("Reached row limit of {}", limit);
                    break;
                }
            }
        }

        info!(rows = rows.len(), "Source export read");

        Ok(rows)
    }
}

impl Default for SourceReader {
    fn default() -> Self {
        Self::new()
    }
}
