//! Warehouse read contracts for downstream consumers
//!
//! The risk-assessment assistant and the classifier trainer read the
//! warehouse through these queries; the ETL pipeline is the sole writer of
//! the tables behind them. The transformers guarantee the joins here are
//! free of dangling keys, so consumers can treat the joined views as
//! well-formed.

use sqlx::PgPool;
use uuid::Uuid;

/// An active risk attached to one project.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActiveRisk {
    pub risk_type: String,
    pub severity: String,
    pub probability: String,
    pub risk_description: String,
    pub mitigation_plan: Option<String>,
}

/// Active risks for one project (risk-assessment consumer).
pub async fn active_risks(db: &PgPool, project_id: Uuid) -> Result<Vec<ActiveRisk>, sqlx::Error> {
    sqlx::query_as::<_, ActiveRisk>(
        r#"
        SELECT risk_type, severity, probability, risk_description, mitigation_plan
        FROM project_risks
        WHERE project_id = $1 AND status = 'ACTIVE'
        "#,
    )
    .bind(project_id)
    .fetch_all(db)
    .await
}

/// One project with its budget and headline risk/delay counts.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectSummary {
    pub project_name: String,
    pub project_type: String,
    pub status: String,
    pub priority: String,
    pub planned_budget: Option<f64>,
    pub actual_budget: Option<f64>,
    pub active_risks: i64,
    pub total_delays: i64,
}

/// Summary for one project (risk-assessment consumer).
pub async fn project_summary(
    db: &PgPool,
    project_id: Uuid,
) -> Result<Option<ProjectSummary>, sqlx::Error> {
    sqlx::query_as::<_, ProjectSummary>(
        r#"
        SELECT
            p.project_name,
            p.project_type,
            p.status,
            p.priority,
            pb.planned_budget,
            pb.actual_budget,
            COUNT(DISTINCT pr.risk_id) AS active_risks,
            COUNT(DISTINCT pd.delay_id) AS total_delays
        FROM projects p
        LEFT JOIN project_budget pb ON pb.project_id = p.project_id
        LEFT JOIN project_risks pr ON pr.project_id = p.project_id AND pr.status = 'ACTIVE'
        LEFT JOIN project_delays pd ON pd.project_id = p.project_id
        WHERE p.project_id = $1
        GROUP BY p.project_name, p.project_type, p.status, p.priority,
                 pb.planned_budget, pb.actual_budget
        "#,
    )
    .bind(project_id)
    .fetch_optional(db)
    .await
}

/// Portfolio-level rollup across all projects.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PortfolioSummary {
    pub total_projects: i64,
    pub on_track: i64,
    pub at_risk: i64,
    pub delayed: i64,
    pub avg_budget_overrun_pct: Option<f64>,
}

/// Rollup for the all-projects view (risk-assessment consumer).
pub async fn portfolio_summary(db: &PgPool) -> Result<PortfolioSummary, sqlx::Error> {
    sqlx::query_as::<_, PortfolioSummary>(
        r#"
        SELECT
            COUNT(*) AS total_projects,
            COUNT(*) FILTER (WHERE p.status = 'ON_TRACK') AS on_track,
            COUNT(*) FILTER (WHERE p.status = 'AT_RISK') AS at_risk,
            COUNT(*) FILTER (WHERE p.status = 'DELAYED') AS delayed,
            AVG(
                CASE
                    WHEN pb.actual_budget > pb.planned_budget
                    THEN (pb.actual_budget - pb.planned_budget) / pb.planned_budget
                    ELSE 0
                END
            ) * 100 AS avg_budget_overrun_pct
        FROM projects p
        LEFT JOIN project_budget pb ON pb.project_id = p.project_id
        "#,
    )
    .fetch_one(db)
    .await
}

/// Per-project feature vector for the classifier trainer.
///
/// `risk_flag` is 1 when the project has any recorded delay or is over
/// budget.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrainingFeatures {
    pub project_type: String,
    pub priority: String,
    pub planned_duration_days: i32,
    pub planned_budget: Option<f64>,
    pub actual_budget: Option<f64>,
    pub active_risks: i64,
    pub total_delays: i64,
    pub risk_flag: i32,
}

/// Feature rows for model training (classifier-trainer consumer).
pub async fn training_features(db: &PgPool) -> Result<Vec<TrainingFeatures>, sqlx::Error> {
    sqlx::query_as::<_, TrainingFeatures>(
        r#"
        SELECT
            p.project_type,
            p.priority,
            (p.planned_end_date - p.start_date) AS planned_duration_days,
            pb.planned_budget,
            pb.actual_budget,
            COUNT(DISTINCT pr.risk_id) AS active_risks,
            COUNT(DISTINCT pd.delay_id) AS total_delays,
            CASE
                WHEN COUNT(DISTINCT pd.delay_id) > 0
                     OR COALESCE(pb.actual_budget > pb.planned_budget, FALSE)
                THEN 1
                ELSE 0
            END AS risk_flag
        FROM projects p
        LEFT JOIN project_budget pb ON pb.project_id = p.project_id
        LEFT JOIN project_risks pr ON pr.project_id = p.project_id AND pr.status = 'ACTIVE'
        LEFT JOIN project_delays pd ON pd.project_id = p.project_id
        GROUP BY p.project_id, p.project_type, p.priority,
                 p.planned_end_date, p.start_date,
                 pb.planned_budget, pb.actual_budget
        "#,
    )
    .fetch_all(db)
    .await
}
