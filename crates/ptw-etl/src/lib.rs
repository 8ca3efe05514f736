//! PTW ETL Library
//!
//! Converts the flat, denormalized project-tracking export into five
//! normalized warehouse tables: projects, budgets, risks, milestones, and
//! delays.
//!
//! # Architecture
//!
//! The pipeline is a strict left-to-right flow; nothing reads back from the
//! warehouse during a run:
//!
//! - **Source** (`source`): reads the CSV export and validates required
//!   columns
//! - **Identity** (`identity`): assigns one surrogate `project_id` per row
//! - **Transform** (`transform`): five pure per-table transformers with
//!   per-row rejection tracking
//! - **Loader** (`loader`): bulk appends into PostgreSQL, one transaction
//!   per table, with bounded retries
//! - **Pipeline** (`pipeline`): orchestration and the result-per-table run
//!   report
//! - **Queries** (`queries`): read contracts consumed by the downstream
//!   risk-assessment and model-training systems

pub mod config;
pub mod identity;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod queries;
pub mod source;
pub mod transform;

// Re-export main types
pub use config::{DatabaseConfig, EtlConfig, LoadConfig};
pub use loader::{connect, LoadError, TableLoader, WarehouseLoader};
pub use models::{
    BudgetRow, BudgetStatus, DelayRow, MilestoneRow, MilestoneStatus, ProjectRow, RiskRow,
    RiskStatus,
};
pub use pipeline::{EtlPipeline, LoadOutcome, RunReport, RunStage, TableReport};
pub use source::{SourceReadError, SourceReader, SourceRow, REQUIRED_COLUMNS};
pub use transform::{Rejection, RejectionSummary, TransformedTables, DEFAULT_CURRENCY};
