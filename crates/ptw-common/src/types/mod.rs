//! Common types used across PTW

use serde::{Deserialize, Serialize};

/// Destination tables in the analytics warehouse.
///
/// The ETL pipeline is the sole writer of these tables; downstream
/// consumers (risk assessment, model training) only read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetTable {
    Projects,
    ProjectBudget,
    ProjectRisks,
    ProjectMilestones,
    ProjectDelays,
}

impl TargetTable {
    /// Warehouse table name as the destination knows it.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetTable::Projects => "PROJECTS",
            TargetTable::ProjectBudget => "PROJECT_BUDGET",
            TargetTable::ProjectRisks => "PROJECT_RISKS",
            TargetTable::ProjectMilestones => "PROJECT_MILESTONES",
            TargetTable::ProjectDelays => "PROJECT_DELAYS",
        }
    }

    /// All destination tables, parent table first.
    pub fn all() -> [TargetTable; 5] {
        [
            TargetTable::Projects,
            TargetTable::ProjectBudget,
            TargetTable::ProjectRisks,
            TargetTable::ProjectMilestones,
            TargetTable::ProjectDelays,
        ]
    }
}

impl std::fmt::Display for TargetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
