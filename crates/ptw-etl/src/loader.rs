//! Warehouse loader
//!
//! Bulk-appends transformed rows into the warehouse, one table per call.
//! Each call is one transaction built from chunked multi-row INSERTs: the
//! whole batch lands or none of it does. The five tables are never wrapped
//! in one cross-table transaction, and the loader performs no foreign-key
//! validation — referential integrity is guaranteed upstream by the
//! transformers.

use async_trait::async_trait;
use ptw_common::types::TargetTable;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DatabaseConfig, LoadConfig};
use crate::models::{BudgetRow, DelayRow, MilestoneRow, ProjectRow, RiskRow};

/// Error types for table loads
#[derive(Debug, Error)]
pub enum LoadError {
    /// Transient connection-level failure; retried up to the configured
    /// bound before becoming fatal for the table.
    #[error("connectivity failure loading {table}: {reason}")]
    Connectivity { table: TargetTable, reason: String },

    /// The destination no longer matches the transformer output. Never
    /// retried.
    #[error("schema mismatch loading {table}: {reason}")]
    Schema { table: TargetTable, reason: String },
}

impl LoadError {
    pub fn table(&self) -> TargetTable {
        match self {
            LoadError::Connectivity { table, .. } => *table,
            LoadError::Schema { table, .. } => *table,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Connectivity { .. })
    }
}

/// Split a database failure into retryable connectivity vs fatal schema
/// drift. Statement-level errors reported by the server mean the INSERT
/// itself no longer fits the destination; everything else is treated as a
/// connection problem.
fn classify(table: TargetTable, err: sqlx::Error) -> LoadError {
    match &err {
        sqlx::Error::Database(db) => LoadError::Schema {
            table,
            reason: db.message().to_string(),
        },
        sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::Encode(_) => LoadError::Schema {
            table,
            reason: err.to_string(),
        },
        _ => LoadError::Connectivity {
            table,
            reason: err.to_string(),
        },
    }
}

/// Open the warehouse connection pool with bounded timeouts.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
}

/// Seam between the orchestrator and the warehouse, one bulk append per
/// destination table.
#[async_trait]
pub trait TableLoader: Send + Sync {
    async fn load_projects(&self, rows: &[ProjectRow]) -> Result<u64, LoadError>;
    async fn load_budgets(&self, rows: &[BudgetRow]) -> Result<u64, LoadError>;
    async fn load_risks(&self, rows: &[RiskRow]) -> Result<u64, LoadError>;
    async fn load_milestones(&self, rows: &[MilestoneRow]) -> Result<u64, LoadError>;
    async fn load_delays(&self, rows: &[DelayRow]) -> Result<u64, LoadError>;
}

/// PostgreSQL bulk loader
pub struct WarehouseLoader {
    db: PgPool,
    chunk_size: usize,
    max_retries: u32,
    retry_delay: Duration,
    load_timeout: Duration,
}

impl WarehouseLoader {
    /// Create a loader over an open pool
    pub fn new(db: PgPool, config: &LoadConfig) -> Self {
        Self {
            db,
            chunk_size: config.chunk_size,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            load_timeout: Duration::from_secs(config.load_timeout_secs),
        }
    }

    /// Drive one table's bulk append with bounded retries.
    ///
    /// Connectivity failures are retried with a linear backoff; schema
    /// failures return immediately. Every attempt runs under the configured
    /// timeout so no load blocks indefinitely.
    async fn with_retry<F, Fut>(
        &self,
        table: TargetTable,
        row_count: usize,
        attempt_load: F,
    ) -> Result<u64, LoadError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<u64, sqlx::Error>>,
    {
        if row_count == 0 {
            info!(table = %table, "No rows to load, skipping");
            return Ok(0);
        }

        info!(table = %table, rows = row_count, "Loading table");

        for attempt in 1..=self.max_retries {
            let error = match tokio::time::timeout(self.load_timeout, attempt_load()).await {
                Ok(Ok(inserted)) => {
                    info!(table = %table, rows = inserted, "Bulk append committed");
                    return Ok(inserted);
                },
                Ok(Err(e)) => classify(table, e),
                Err(_) => LoadError::Connectivity {
                    table,
                    reason: format!("bulk load timed out after {:?}", self.load_timeout),
                },
            };

            if error.is_retryable() && attempt < self.max_retries {
                let delay = self.retry_delay * attempt;
                warn!(
                    table = %table,
                    attempt,
                    max_retries = self.max_retries,
                    error = %error,
                    "Load attempt failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            } else {
                return Err(error);
            }
        }

        unreachable!("Retry loop should always return")
    }

    async fn insert_projects(&self, rows: &[ProjectRow]) -> Result<u64, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(self.chunk_size) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO projects (
                    project_id, project_name, project_type,
                    start_date, planned_end_date, actual_end_date,
                    status, priority, owner
                ) ",
            );

            query_builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.project_id)
                    .push_bind(&row.project_name)
                    .push_bind(&row.project_type)
                    .push_bind(row.start_date)
                    .push_bind(row.planned_end_date)
                    .push_bind(row.actual_end_date)
                    .push_bind(&row.status)
                    .push_bind(&row.priority)
                    .push_bind(&row.owner);
            });

            inserted += query_builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn insert_budgets(&self, rows: &[BudgetRow]) -> Result<u64, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(self.chunk_size) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO project_budget (
                    budget_id, project_id,
                    planned_budget, actual_budget,
                    currency, budget_status
                ) ",
            );

            query_builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.budget_id)
                    .push_bind(row.project_id)
                    .push_bind(row.planned_budget)
                    .push_bind(row.actual_budget)
                    .push_bind(&row.currency)
                    .push_bind(row.budget_status.as_str());
            });

            inserted += query_builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn insert_risks(&self, rows: &[RiskRow]) -> Result<u64, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(self.chunk_size) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO project_risks (
                    risk_id, project_id,
                    risk_type, risk_description,
                    severity, probability, mitigation_plan, status
                ) ",
            );

            query_builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.risk_id)
                    .push_bind(row.project_id)
                    .push_bind(&row.risk_type)
                    .push_bind(&row.risk_description)
                    .push_bind(&row.severity)
                    .push_bind(&row.probability)
                    .push_bind(&row.mitigation_plan)
                    .push_bind(row.status.as_str());
            });

            inserted += query_builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn insert_milestones(&self, rows: &[MilestoneRow]) -> Result<u64, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(self.chunk_size) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO project_milestones (
                    milestone_id, project_id,
                    milestone_name, planned_date, actual_date, status
                ) ",
            );

            query_builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.milestone_id)
                    .push_bind(row.project_id)
                    .push_bind(&row.milestone_name)
                    .push_bind(row.planned_date)
                    .push_bind(row.actual_date)
                    .push_bind(row.status.as_str());
            });

            inserted += query_builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn insert_delays(&self, rows: &[DelayRow]) -> Result<u64, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(self.chunk_size) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO project_delays (
                    delay_id, project_id, milestone_id,
                    delay_reason, delay_days, impact_level
                ) ",
            );

            query_builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.delay_id)
                    .push_bind(row.project_id)
                    .push_bind(row.milestone_id)
                    .push_bind(&row.delay_reason)
                    .push_bind(row.delay_days)
                    .push_bind(&row.impact_level);
            });

            inserted += query_builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }
}

#[async_trait]
impl TableLoader for WarehouseLoader {
    async fn load_projects(&self, rows: &[ProjectRow]) -> Result<u64, LoadError> {
        self.with_retry(TargetTable::Projects, rows.len(), || {
            self.insert_projects(rows)
        })
        .await
    }

    async fn load_budgets(&self, rows: &[BudgetRow]) -> Result<u64, LoadError> {
        self.with_retry(TargetTable::ProjectBudget, rows.len(), || {
            self.insert_budgets(rows)
        })
        .await
    }

    async fn load_risks(&self, rows: &[RiskRow]) -> Result<u64, LoadError> {
        self.with_retry(TargetTable::ProjectRisks, rows.len(), || {
            self.insert_risks(rows)
        })
        .await
    }

    async fn load_milestones(&self, rows: &[MilestoneRow]) -> Result<u64, LoadError> {
        self.with_retry(TargetTable::ProjectMilestones, rows.len(), || {
            self.insert_milestones(rows)
        })
        .await
    }

    async fn load_delays(&self, rows: &[DelayRow]) -> Result<u64, LoadError> {
        self.with_retry(TargetTable::ProjectDelays, rows.len(), || {
            self.insert_delays(rows)
        })
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================
