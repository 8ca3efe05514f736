//! Pipeline orchestration
//!
//! Sequences read → identity → transform → load for one source export and
//! aggregates a result per destination table. The five loads share no
//! transaction: a table that fails is reported as failed while the others
//! still land, and the caller decides from the report whether to rerun
//! everything or only the failed tables.

use ptw_common::types::TargetTable;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

use crate::config::EtlConfig;
use crate::identity::{assign_project_ids, KeyedRow};
use crate::loader::{LoadError, TableLoader};
use crate::source::{SourceReadError, SourceReader};
use crate::transform::{transform_all, RejectionSummary, TransformedTables};

/// Stages of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    Init,
    Read,
    AssignIdentity,
    Transform,
    Load,
    Done,
    Failed,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Init => "INIT",
            RunStage::Read => "READ",
            RunStage::AssignIdentity => "ASSIGN_IDENTITY",
            RunStage::Transform => "TRANSFORM",
            RunStage::Load => "LOAD",
            RunStage::Done => "DONE",
            RunStage::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one table's load.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Bulk append committed with this many rows.
    Loaded { rows: u64 },

    /// The transformers produced no candidate rows for this table.
    SkippedEmpty,

    /// Every candidate row failed validation; the table was not loaded.
    AllRowsRejected { rejected: usize },

    /// The load failed (after retries, when the failure was retryable).
    Failed { reason: String, retryable: bool },
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. } | LoadOutcome::SkippedEmpty)
    }
}

/// One table's entry in the run report.
#[derive(Debug, Serialize)]
pub struct TableReport {
    pub table: TargetTable,
    pub outcome: LoadOutcome,
}

/// Result object for a whole run.
///
/// Every failure the run observed is inspectable here; nothing is reported
/// only through logs.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub stage_reached: RunStage,
    pub source_rows: usize,
    pub tables: Vec<TableReport>,
    pub rejections: RejectionSummary,
}

impl RunReport {
    /// True when every table either loaded or was a legitimate no-op.
    pub fn succeeded(&self) -> bool {
        self.stage_reached == RunStage::Done && self.tables.iter().all(|t| t.outcome.is_success())
    }

    /// Tables whose load did not succeed.
    pub fn failed_tables(&self) -> Vec<TargetTable> {
        self.tables
            .iter()
            .filter(|t| !t.outcome.is_success())
            .map(|t| t.table)
            .collect()
    }

    /// Rows persisted for one table, when its load committed.
    pub fn loaded_rows(&self, table: TargetTable) -> Option<u64> {
        self.tables.iter().find(|t| t.table == table).and_then(|t| match t.outcome {
            LoadOutcome::Loaded { rows } => Some(rows),
            _ => None,
        })
    }
}

/// Orchestrates one ETL run over a source export.
pub struct EtlPipeline<L> {
    config: EtlConfig,
    loader: L,
    row_limit: Option<usize>,
}

impl<L: TableLoader> EtlPipeline<L> {
    /// Create a pipeline from an explicit configuration and a loader.
    ///
    /// All connection state travels in via `config`/`loader`; the pipeline
    /// reads nothing from the process environment.
    pub fn new(config: EtlConfig, loader: L) -> Self {
        Self {
            config,
            loader,
            row_limit: None,
        }
    }

    /// Cap the number of source rows processed (for smoke runs).
    pub fn with_row_limit(mut self, limit: Option<usize>) -> Self {
        self.row_limit = limit;
        self
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// READ + ASSIGN_IDENTITY: read the export and key every row.
    pub fn extract(&self, source: &Path) -> Result<Vec<KeyedRow>, SourceReadError> {
        info!(stage = %RunStage::Read, source = %source.display(), "Reading source");
        let reader = match self.row_limit {
            Some(limit) => SourceReader::with_limit(limit),
            None => SourceReader::new(),
        };
        let rows = reader.read(source)?;

        info!(stage = %RunStage::AssignIdentity, rows = rows.len(), "Assigning project identifiers");
        Ok(assign_project_ids(rows))
    }

    /// TRANSFORM: fan the keyed rows out into the five table row sets.
    ///
    /// Pure; callers that abort a run do so after this point. Once `run`
    /// enters the load stage, each table runs to completion or failure.
    pub fn transform(&self, rows: &[KeyedRow]) -> TransformedTables {
        info!(stage = %RunStage::Transform, "Transforming rows");
        let transformed = transform_all(rows);

        if !transformed.rejections.is_empty() {
            info!(
                rejected = transformed.rejections.total(),
                "Some rows were rejected during transformation"
            );
        }

        transformed
    }

    /// Full run: read, key, transform, and load all five tables.
    ///
    /// Source failures abort before anything is loaded. Load failures never
    /// abort the run; they surface as that table's outcome in the report.
    pub async fn run(&self, source: &Path) -> Result<RunReport, SourceReadError> {
        info!(source = %source.display(), "Starting ETL run");

        let keyed = self.extract(source)?;
        let source_rows = keyed.len();

        let TransformedTables {
            projects,
            budgets,
            risks,
            milestones,
            delays,
            rejections,
        } = self.transform(&keyed);

        info!(stage = %RunStage::Load, "Loading warehouse tables");

        let mut tables = Vec::with_capacity(5);
        tables.push(self.load_table(
            TargetTable::Projects,
            projects.len(),
            rejections.for_table(TargetTable::Projects).len(),
            self.loader.load_projects(&projects),
        )
        .await);
        tables.push(self.load_table(
            TargetTable::ProjectBudget,
            budgets.len(),
            rejections.for_table(TargetTable::ProjectBudget).len(),
            self.loader.load_budgets(&budgets),
        )
        .await);
        tables.push(self.load_table(
            TargetTable::ProjectRisks,
            risks.len(),
            rejections.for_table(TargetTable::ProjectRisks).len(),
            self.loader.load_risks(&risks),
        )
        .await);
        tables.push(self.load_table(
            TargetTable::ProjectMilestones,
            milestones.len(),
            rejections.for_table(TargetTable::ProjectMilestones).len(),
            self.loader.load_milestones(&milestones),
        )
        .await);
        tables.push(self.load_table(
            TargetTable::ProjectDelays,
            delays.len(),
            rejections.for_table(TargetTable::ProjectDelays).len(),
            self.loader.load_delays(&delays),
        )
        .await);

        let report = RunReport {
            stage_reached: RunStage::Done,
            source_rows,
            tables,
            rejections,
        };

        if report.succeeded() {
            info!(stage = %RunStage::Done, rows = source_rows, "ETL run completed");
        } else {
            error!(
                failed_tables = ?report.failed_tables(),
                "ETL run completed with table failures"
            );
        }

        Ok(report)
    }

    /// Resolve one table's outcome.
    ///
    /// A table emptied by validation is fatal for that table and never
    /// reaches the loader; a table with no candidates at all is a no-op.
    async fn load_table<Fut>(
        &self,
        table: TargetTable,
        row_count: usize,
        rejected: usize,
        load: Fut,
    ) -> TableReport
    where
        Fut: std::future::Future<Output = Result<u64, LoadError>>,
    {
        let outcome = if row_count == 0 && rejected > 0 {
            error!(table = %table, rejected, "Every candidate row was rejected; table not loaded");
            LoadOutcome::AllRowsRejected { rejected }
        } else if row_count == 0 {
            info!(table = %table, "No candidate rows for table");
            LoadOutcome::SkippedEmpty
        } else {
            match load.await {
                Ok(rows) => LoadOutcome::Loaded { rows },
                Err(e) => {
                    error!(table = %table, error = %e, "Table load failed");
                    LoadOutcome::Failed {
                        reason: e.to_string(),
                        retryable: e.is_retryable(),
                    }
                },
            }
        };

        TableReport { table, outcome }
    }
}
