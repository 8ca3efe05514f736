//! Entity transformers
//!
//! Five pure functions, one per destination table, each projecting a keyed
//! source row into zero or more table rows. All warehouse effects live in
//! the loader; everything here is deterministic given the keyed rows.
//!
//! Rows that fail coercion are collected per table with the original row
//! index and the reason, and excluded from that table's output without
//! aborting the run. Risk, milestone, and delay groups that are entirely
//! empty on a row produce no row at all — the flat export carries at most
//! one of each per project, but the `Vec`-shaped output keeps the contract
//! one-to-many ready.

use chrono::NaiveDate;
use ptw_common::types::TargetTable;
use serde::Serialize;
use uuid::Uuid;

use crate::identity::KeyedRow;
use crate::models::{
    BudgetRow, BudgetStatus, DelayRow, MilestoneRow, MilestoneStatus, ProjectRow, RiskRow,
    RiskStatus,
};

/// Fixed currency for budget rows; the source export carries no currency
/// column.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Date format used throughout the source export.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A row excluded from one table's output.
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub row_index: usize,
    pub reason: String,
}

/// Per-table rejection lists for one run.
#[derive(Debug, Default, Serialize)]
pub struct RejectionSummary {
    pub projects: Vec<Rejection>,
    pub budgets: Vec<Rejection>,
    pub risks: Vec<Rejection>,
    pub milestones: Vec<Rejection>,
    pub delays: Vec<Rejection>,
}

impl RejectionSummary {
    pub fn total(&self) -> usize {
        self.projects.len()
            + self.budgets.len()
            + self.risks.len()
            + self.milestones.len()
            + self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn for_table(&self, table: TargetTable) -> &[Rejection] {
        match table {
            TargetTable::Projects => &self.projects,
            TargetTable::ProjectBudget => &self.budgets,
            TargetTable::ProjectRisks => &self.risks,
            TargetTable::ProjectMilestones => &self.milestones,
            TargetTable::ProjectDelays => &self.delays,
        }
    }
}

/// Output of the transform stage.
#[derive(Debug, Default)]
pub struct TransformedTables {
    pub projects: Vec<ProjectRow>,
    pub budgets: Vec<BudgetRow>,
    pub risks: Vec<RiskRow>,
    pub milestones: Vec<MilestoneRow>,
    pub delays: Vec<DelayRow>,
    pub rejections: RejectionSummary,
}

/// Run all five transformers over the keyed source rows.
///
/// The milestone transformer runs before the delay transformer for each row
/// so the generated `milestone_id` can be threaded into the delay row.
pub fn transform_all(rows: &[KeyedRow]) -> TransformedTables {
    let mut out = TransformedTables::default();

    for keyed in rows {
        let reject = |reason: String| Rejection {
            row_index: keyed.row_index,
            reason,
        };

        match project_row(keyed) {
            Ok(row) => out.projects.push(row),
            Err(reason) => out.rejections.projects.push(reject(reason)),
        }

        match budget_row(keyed) {
            Ok(row) => out.budgets.push(row),
            Err(reason) => out.rejections.budgets.push(reject(reason)),
        }

        match risk_row(keyed) {
            Ok(Some(row)) => out.risks.push(row),
            Ok(None) => {},
            Err(reason) => out.rejections.risks.push(reject(reason)),
        }

        let milestone_id = match milestone_row(keyed) {
            Ok(Some(row)) => {
                let id = row.milestone_id;
                out.milestones.push(row);
                Some(id)
            },
            Ok(None) => None,
            Err(reason) => {
                out.rejections.milestones.push(reject(reason));
                None
            },
        };

        match delay_row(keyed, milestone_id) {
            Ok(Some(row)) => out.delays.push(row),
            Ok(None) => {},
            Err(reason) => out.rejections.delays.push(reject(reason)),
        }
    }

    out
}

// ============================================================================
// Per-table transformers
// ============================================================================

/// Projects: direct projection of the project columns, no derivation.
pub fn project_row(keyed: &KeyedRow) -> Result<ProjectRow, String> {
    let row = &keyed.row;

    Ok(ProjectRow {
        project_id: keyed.project_id,
        project_name: required(row.project_name.as_deref(), "PROJECT_NAME")?,
        project_type: required(row.project_type.as_deref(), "PROJECT_TYPE")?,
        start_date: parse_date(&required(row.start_date.as_deref(), "START_DATE")?, "START_DATE")?,
        planned_end_date: parse_date(
            &required(row.planned_end_date.as_deref(), "PLANNED_END_DATE")?,
            "PLANNED_END_DATE",
        )?,
        actual_end_date: optional_date(row.actual_end_date.as_deref(), "ACTUAL_END_DATE")?,
        status: required(row.status.as_deref(), "STATUS")?,
        priority: required(row.priority.as_deref(), "PRIORITY")?,
        owner: required(row.owner.as_deref(), "OWNER")?,
    })
}

/// Budget: generates `budget_id`, fixes the currency, derives the status.
///
/// Missing amounts are rejected exactly like non-numeric ones; a null never
/// reaches the over/under comparison.
pub fn budget_row(keyed: &KeyedRow) -> Result<BudgetRow, String> {
    let row = &keyed.row;

    let planned = parse_amount(row.planned_budget.as_deref(), "PLANNED_BUDGET")?;
    let actual = parse_amount(row.actual_budget.as_deref(), "ACTUAL_BUDGET")?;

    Ok(BudgetRow {
        budget_id: Uuid::new_v4(),
        project_id: keyed.project_id,
        planned_budget: planned,
        actual_budget: actual,
        currency: DEFAULT_CURRENCY.to_string(),
        budget_status: BudgetStatus::derive(planned, actual),
    })
}

/// Risks: one row when the risk field-group is populated, none otherwise.
/// Status is always ACTIVE at creation.
pub fn risk_row(keyed: &KeyedRow) -> Result<Option<RiskRow>, String> {
    let row = &keyed.row;

    if row.risk_type.is_none() && row.risk_description.is_none() {
        return Ok(None);
    }

    Ok(Some(RiskRow {
        risk_id: Uuid::new_v4(),
        project_id: keyed.project_id,
        risk_type: required(row.risk_type.as_deref(), "RISK_TYPE")?,
        risk_description: required(row.risk_description.as_deref(), "RISK_DESCRIPTION")?,
        severity: required(row.severity.as_deref(), "SEVERITY")?,
        probability: required(row.probability.as_deref(), "PROBABILITY")?,
        mitigation_plan: row.mitigation_plan.clone(),
        status: RiskStatus::Active,
    }))
}

/// Milestones: one row when a milestone name is present; status derives
/// from the presence of an actual date.
pub fn milestone_row(keyed: &KeyedRow) -> Result<Option<MilestoneRow>, String> {
    let row = &keyed.row;

    let Some(name) = row.milestone_name.as_deref() else {
        return Ok(None);
    };

    let actual_date = optional_date(row.actual_date.as_deref(), "ACTUAL_DATE")?;

    Ok(Some(MilestoneRow {
        milestone_id: Uuid::new_v4(),
        project_id: keyed.project_id,
        milestone_name: name.to_string(),
        planned_date: parse_date(
            &required(row.planned_date.as_deref(), "PLANNED_DATE")?,
            "PLANNED_DATE",
        )?,
        actual_date,
        status: MilestoneStatus::derive(actual_date),
    }))
}

/// Delays: one row when the delay field-group is populated. The row must
/// reference the milestone generated from the same source row; a delay with
/// no sibling milestone has nothing to attach to and is rejected.
pub fn delay_row(keyed: &KeyedRow, milestone_id: Option<Uuid>) -> Result<Option<DelayRow>, String> {
    let row = &keyed.row;

    if row.delay_reason.is_none() && row.delay_days.is_none() {
        return Ok(None);
    }

    let milestone_id =
        milestone_id.ok_or_else(|| "delay references no milestone from this row".to_string())?;

    let delay_days_raw = required(row.delay_days.as_deref(), "DELAY_DAYS")?;
    let delay_days = delay_days_raw
        .parse::<i32>()
        .map_err(|_| format!("non-numeric value in DELAY_DAYS: {}", delay_days_raw))?;

    Ok(Some(DelayRow {
        delay_id: Uuid::new_v4(),
        project_id: keyed.project_id,
        milestone_id,
        delay_reason: required(row.delay_reason.as_deref(), "DELAY_REASON")?,
        delay_days,
        impact_level: required(row.impact_level.as_deref(), "IMPACT_LEVEL")?,
    }))
}

// ============================================================================
// Coercion helpers
// ============================================================================

fn required(value: Option<&str>, column: &str) -> Result<String, String> {
    value
        .map(str::to_owned)
        .ok_or_else(|| format!("missing value for {}", column))
}

fn parse_date(value: &str, column: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| format!("unparseable date in {}: {}", column, value))
}

fn optional_date(value: Option<&str>, column: &str) -> Result<Option<NaiveDate>, String> {
    match value {
        Some(raw) => parse_date(raw, column).map(Some),
        None => Ok(None),
    }
}

fn parse_amount(value: Option<&str>, column: &str) -> Result<f64, String> {
    let raw = value.ok_or_else(|| format!("missing value for {}", column))?;
    raw.parse::<f64>()
        .map_err(|_| format!("non-numeric value in {}: {}", column, raw))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::assign_project_ids;
    use crate::source::SourceRow;

    fn full_row() -> SourceRow {
        SourceRow {
            project_name: Some("Alpha".into()),
            project_type: Some("Infrastructure".into()),
            start_date: Some("2026-01-01".into()),
            planned_end_date: Some("2026-06-30".into()),
            actual_end_date: None,
            status: Some("ON_TRACK".into()),
            priority: Some("HIGH".into()),
            owner: Some("Lee".into()),
            planned_budget: Some("1000".into()),
            actual_budget: Some("1200".into()),
            risk_type: Some("Technical".into()),
            risk_description: Some("Vendor slip".into()),
            severity: Some("HIGH".into()),
            probability: Some("0.4".into()),
            mitigation_plan: Some("Escalate".into()),
            milestone_name: Some("Kickoff".into()),
            planned_date: Some("2026-02-01".into()),
            actual_date: None,
            delay_reason: Some("Scope change".into()),
            delay_days: Some("14".into()),
            impact_level: Some("HIGH".into()),
        }
    }

    fn keyed(rows: Vec<SourceRow>) -> Vec<KeyedRow> {
        assign_project_ids(rows)
    }

    #[test]
    fn test_full_row_fans_out_to_all_tables() {
        let out = transform_all(&keyed(vec![full_row()]));

        assert_eq!(out.projects.len(), 1);
        assert_eq!(out.budgets.len(), 1);
        assert_eq!(out.risks.len(), 1);
        assert_eq!(out.milestones.len(), 1);
        assert_eq!(out.delays.len(), 1);
        assert!(out.rejections.is_empty());
    }

    #[test]
    fn test_child_rows_share_the_parent_project_id() {
        let out = transform_all(&keyed(vec![full_row()]));
        let project_id = out.projects[0].project_id;

        assert_eq!(out.budgets[0].project_id, project_id);
        assert_eq!(out.risks[0].project_id, project_id);
        assert_eq!(out.milestones[0].project_id, project_id);
        assert_eq!(out.delays[0].project_id, project_id);
    }

    #[test]
    fn test_delay_references_the_sibling_milestone() {
        let out = transform_all(&keyed(vec![full_row()]));
        assert_eq!(out.delays[0].milestone_id, out.milestones[0].milestone_id);
    }

    #[test]
    fn test_over_budget_and_in_progress_derivation() {
        // PLANNED_BUDGET=1000, ACTUAL_BUDGET=1200, ACTUAL_DATE=null
        let out = transform_all(&keyed(vec![full_row()]));

        assert_eq!(out.budgets[0].budget_status, BudgetStatus::OverBudget);
        assert_eq!(out.budgets[0].currency, DEFAULT_CURRENCY);
        assert_eq!(out.milestones[0].status, MilestoneStatus::InProgress);
    }

    #[test]
    fn test_completed_milestone_when_actual_date_present() {
        let mut row = full_row();
        row.actual_date = Some("2026-02-10".into());

        let out = transform_all(&keyed(vec![row]));
        assert_eq!(out.milestones[0].status, MilestoneStatus::Completed);
    }

    #[test]
    fn test_equal_budgets_are_under_budget() {
        let mut row = full_row();
        row.actual_budget = Some("1000".into());

        let out = transform_all(&keyed(vec![row]));
        assert_eq!(out.budgets[0].budget_status, BudgetStatus::UnderBudget);
    }

    #[test]
    fn test_non_numeric_budget_rejected_project_survives() {
        let mut row = full_row();
        row.actual_budget = Some("n/a".into());

        let out = transform_all(&keyed(vec![row]));

        assert_eq!(out.projects.len(), 1);
        assert!(out.budgets.is_empty());
        assert_eq!(out.rejections.budgets.len(), 1);
        assert_eq!(out.rejections.budgets[0].row_index, 0);
        assert!(out.rejections.budgets[0].reason.contains("ACTUAL_BUDGET"));
    }

    #[test]
    fn test_missing_budget_rejected_not_defaulted() {
        // A null amount must never fall through the over/under comparison.
        let mut row = full_row();
        row.planned_budget = None;

        let out = transform_all(&keyed(vec![row]));

        assert!(out.budgets.is_empty());
        assert_eq!(out.rejections.budgets.len(), 1);
        assert!(out.rejections.budgets[0].reason.contains("PLANNED_BUDGET"));
    }

    #[test]
    fn test_empty_risk_group_produces_no_row_and_no_rejection() {
        let mut row = full_row();
        row.risk_type = None;
        row.risk_description = None;
        row.severity = None;
        row.probability = None;
        row.mitigation_plan = None;

        let out = transform_all(&keyed(vec![row]));
        assert!(out.risks.is_empty());
        assert!(out.rejections.risks.is_empty());
    }

    #[test]
    fn test_partial_risk_group_is_rejected() {
        let mut row = full_row();
        row.severity = None;

        let out = transform_all(&keyed(vec![row]));
        assert!(out.risks.is_empty());
        assert_eq!(out.rejections.risks.len(), 1);
        assert!(out.rejections.risks[0].reason.contains("SEVERITY"));
    }

    #[test]
    fn test_risk_status_is_always_active() {
        let out = transform_all(&keyed(vec![full_row()]));
        assert_eq!(out.risks[0].status, RiskStatus::Active);
    }

    #[test]
    fn test_delay_without_milestone_is_rejected() {
        let mut row = full_row();
        row.milestone_name = None;
        row.planned_date = None;

        let out = transform_all(&keyed(vec![row]));

        assert!(out.milestones.is_empty());
        assert!(out.delays.is_empty());
        assert_eq!(out.rejections.delays.len(), 1);
        assert!(out.rejections.delays[0].reason.contains("milestone"));
    }

    #[test]
    fn test_unparseable_date_rejects_the_project_row() {
        let mut row = full_row();
        row.start_date = Some("01/02/2026".into());

        let out = transform_all(&keyed(vec![row]));

        assert!(out.projects.is_empty());
        assert_eq!(out.rejections.projects.len(), 1);
        assert!(out.rejections.projects[0].reason.contains("START_DATE"));
        // Sibling tables are unaffected by the project rejection
        assert_eq!(out.budgets.len(), 1);
    }

    #[test]
    fn test_rejection_indexes_point_at_source_rows() {
        let mut bad = full_row();
        bad.actual_budget = Some("oops".into());

        let out = transform_all(&keyed(vec![full_row(), bad, full_row()]));

        assert_eq!(out.budgets.len(), 2);
        assert_eq!(out.rejections.budgets.len(), 1);
        assert_eq!(out.rejections.budgets[0].row_index, 1);
    }
}
