// Warehouse Row Models
//
// One struct per destination table, shaped exactly as the bulk loader binds
// them. Derived status fields live here as enums with their derivation
// rules, so the transformers never hand-roll a status string.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Projects
// ============================================================================

/// One row of the PROJECTS table; a direct projection of the source columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRow {
    pub project_id: Uuid,
    pub project_name: String,
    pub project_type: String,
    pub start_date: NaiveDate,
    pub planned_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
    pub status: String,
    pub priority: String,
    pub owner: String,
}

// ============================================================================
// Budget
// ============================================================================

/// One row of the PROJECT_BUDGET table (1:1 with its project).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetRow {
    pub budget_id: Uuid,
    pub project_id: Uuid,
    pub planned_budget: f64,
    pub actual_budget: f64,
    pub currency: String,
    pub budget_status: BudgetStatus,
}

/// Derived budget health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    OverBudget,
    UnderBudget,
}

impl BudgetStatus {
    /// OVER_BUDGET iff actual exceeds planned; equal amounts are under
    /// budget. Callers must resolve missing amounts before this point —
    /// there is no null branch here by design of the transformer contract.
    pub fn derive(planned: f64, actual: f64) -> Self {
        if actual > planned {
            BudgetStatus::OverBudget
        } else {
            BudgetStatus::UnderBudget
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::OverBudget => "OVER_BUDGET",
            BudgetStatus::UnderBudget => "UNDER_BUDGET",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "OVER_BUDGET" => Ok(BudgetStatus::OverBudget),
            "UNDER_BUDGET" => Ok(BudgetStatus::UnderBudget),
            _ => Err(format!("Unknown budget status: {}", s)),
        }
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Risks
// ============================================================================

/// One row of the PROJECT_RISKS table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRow {
    pub risk_id: Uuid,
    pub project_id: Uuid,
    pub risk_type: String,
    pub risk_description: String,
    pub severity: String,
    pub probability: String,
    pub mitigation_plan: Option<String>,
    pub status: RiskStatus,
}

/// Risk lifecycle state.
///
/// The pipeline only ever writes `Active`; transitions are owned by
/// downstream systems, never by a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskStatus {
    Active,
    Mitigated,
    Closed,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Active => "ACTIVE",
            RiskStatus::Mitigated => "MITIGATED",
            RiskStatus::Closed => "CLOSED",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "ACTIVE" => Ok(RiskStatus::Active),
            "MITIGATED" => Ok(RiskStatus::Mitigated),
            "CLOSED" => Ok(RiskStatus::Closed),
            _ => Err(format!("Unknown risk status: {}", s)),
        }
    }
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Milestones
// ============================================================================

/// One row of the PROJECT_MILESTONES table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneRow {
    pub milestone_id: Uuid,
    pub project_id: Uuid,
    pub milestone_name: String,
    pub planned_date: NaiveDate,
    pub actual_date: Option<NaiveDate>,
    pub status: MilestoneStatus,
}

/// Derived milestone completion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    Completed,
    InProgress,
}

impl MilestoneStatus {
    /// Presence of an actual date is the sole discriminator.
    pub fn derive(actual_date: Option<NaiveDate>) -> Self {
        if actual_date.is_some() {
            MilestoneStatus::Completed
        } else {
            MilestoneStatus::InProgress
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Completed => "COMPLETED",
            MilestoneStatus::InProgress => "IN_PROGRESS",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "COMPLETED" => Ok(MilestoneStatus::Completed),
            "IN_PROGRESS" => Ok(MilestoneStatus::InProgress),
            _ => Err(format!("Unknown milestone status: {}", s)),
        }
    }
}

impl std::fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Delays
// ============================================================================

/// One row of the PROJECT_DELAYS table.
///
/// `milestone_id` always names the milestone generated from the same source
/// row; the transformer threads it through rather than minting its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayRow {
    pub delay_id: Uuid,
    pub project_id: Uuid,
    pub milestone_id: Uuid,
    pub delay_reason: String,
    pub delay_days: i32,
    pub impact_level: String,
}

// ============================================================================
// Tests
// ============================================================================
