//! End-to-end pipeline tests
//!
//! Exercise the full read → identity → transform → load flow against an
//! in-memory loader so the partial-failure contract can be observed without
//! a live warehouse.

use async_trait::async_trait;
use ptw_common::types::TargetTable;
use ptw_etl::{
    BudgetRow, BudgetStatus, DelayRow, EtlConfig, EtlPipeline, LoadError, LoadOutcome,
    MilestoneRow, MilestoneStatus, ProjectRow, RiskRow, RunReport, SourceReadError, TableLoader,
};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Mutex;
use uuid::Uuid;

const HEADER: &str = "PROJECT_NAME,PROJECT_TYPE,START_DATE,PLANNED_END_DATE,ACTUAL_END_DATE,STATUS,PRIORITY,OWNER,PLANNED_BUDGET,ACTUAL_BUDGET,RISK_TYPE,RISK_DESCRIPTION,SEVERITY,PROBABILITY,MITIGATION_PLAN,MILESTONE_NAME,PLANNED_DATE,ACTUAL_DATE,DELAY_REASON,DELAY_DAYS,IMPACT_LEVEL";

/// A source row with every field-group populated.
const FULL_ROW: &str = "Alpha,Infrastructure,2026-01-01,2026-06-30,,ON_TRACK,HIGH,Lee,1000,1200,Technical,Vendor slip,HIGH,0.4,Escalate,Kickoff,2026-02-01,,Scope change,14,HIGH";

fn csv_file(rows: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

/// In-memory loader that records loaded rows and can be told to fail
/// specific tables with a connectivity error.
#[derive(Default)]
struct RecordingLoader {
    fail_tables: Vec<TargetTable>,
    projects: Mutex<Vec<ProjectRow>>,
    budgets: Mutex<Vec<BudgetRow>>,
    risks: Mutex<Vec<RiskRow>>,
    milestones: Mutex<Vec<MilestoneRow>>,
    delays: Mutex<Vec<DelayRow>>,
}

impl RecordingLoader {
    fn failing(tables: Vec<TargetTable>) -> Self {
        Self {
            fail_tables: tables,
            ..Default::default()
        }
    }

    fn fail_if(&self, table: TargetTable) -> Result<(), LoadError> {
        if self.fail_tables.contains(&table) {
            return Err(LoadError::Connectivity {
                table,
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TableLoader for RecordingLoader {
    async fn load_projects(&self, rows: &[ProjectRow]) -> Result<u64, LoadError> {
        self.fail_if(TargetTable::Projects)?;
        self.projects.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn load_budgets(&self, rows: &[BudgetRow]) -> Result<u64, LoadError> {
        self.fail_if(TargetTable::ProjectBudget)?;
        self.budgets.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn load_risks(&self, rows: &[RiskRow]) -> Result<u64, LoadError> {
        self.fail_if(TargetTable::ProjectRisks)?;
        self.risks.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn load_milestones(&self, rows: &[MilestoneRow]) -> Result<u64, LoadError> {
        self.fail_if(TargetTable::ProjectMilestones)?;
        self.milestones.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn load_delays(&self, rows: &[DelayRow]) -> Result<u64, LoadError> {
        self.fail_if(TargetTable::ProjectDelays)?;
        self.delays.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}

fn outcome(report: &RunReport, table: TargetTable) -> &LoadOutcome {
    &report
        .tables
        .iter()
        .find(|t| t.table == table)
        .unwrap()
        .outcome
}

#[tokio::test]
async fn test_over_budget_in_progress_row_counts() {
    // One row: PLANNED_BUDGET=1000, ACTUAL_BUDGET=1200, ACTUAL_DATE empty,
    // no risk and no delay.
    let row = "Alpha,Infrastructure,2026-01-01,2026-06-30,,ON_TRACK,HIGH,Lee,1000,1200,,,,,,Kickoff,2026-02-01,,,,";
    let file = csv_file(&[row]);

    let loader = RecordingLoader::default();
    let pipeline = EtlPipeline::new(EtlConfig::default(), loader);
    let report = pipeline.run(file.path()).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.loaded_rows(TargetTable::Projects), Some(1));
    assert_eq!(report.loaded_rows(TargetTable::ProjectBudget), Some(1));
    assert_eq!(report.loaded_rows(TargetTable::ProjectMilestones), Some(1));
    assert!(matches!(
        outcome(&report, TargetTable::ProjectRisks),
        LoadOutcome::SkippedEmpty
    ));
    assert!(matches!(
        outcome(&report, TargetTable::ProjectDelays),
        LoadOutcome::SkippedEmpty
    ));
}

#[tokio::test]
async fn test_derived_statuses_reach_the_loader() {
    let file = csv_file(&[FULL_ROW]);

    let loader = RecordingLoader::default();
    let pipeline = EtlPipeline::new(EtlConfig::default(), loader);
    let report = pipeline.run(file.path()).await.unwrap();
    assert!(report.succeeded());

    // The report holds outcomes only; inspect the derived fields through a
    // second transform pass over the same file
    let rows = ptw_etl::SourceReader::new().read(file.path()).unwrap();
    let keyed = ptw_etl::identity::assign_project_ids(rows);
    let transformed = ptw_etl::transform::transform_all(&keyed);

    assert_eq!(transformed.budgets[0].budget_status, BudgetStatus::OverBudget);
    assert_eq!(
        transformed.milestones[0].status,
        MilestoneStatus::InProgress
    );
}

#[tokio::test]
async fn test_non_numeric_budget_rejected_while_project_loads() {
    let bad_budget = "Alpha,Infrastructure,2026-01-01,2026-06-30,,ON_TRACK,HIGH,Lee,1000,not-a-number,,,,,,Kickoff,2026-02-01,,,,";
    let file = csv_file(&[bad_budget]);

    let loader = RecordingLoader::default();
    let pipeline = EtlPipeline::new(EtlConfig::default(), loader);
    let report = pipeline.run(file.path()).await.unwrap();

    assert_eq!(report.loaded_rows(TargetTable::Projects), Some(1));
    assert!(matches!(
        outcome(&report, TargetTable::ProjectBudget),
        LoadOutcome::AllRowsRejected { rejected: 1 }
    ));
    assert_eq!(report.rejections.budgets.len(), 1);
    assert!(report.rejections.budgets[0].reason.contains("ACTUAL_BUDGET"));
    assert!(!report.succeeded());
}

#[tokio::test]
async fn test_risks_load_failure_does_not_abort_the_run() {
    let file = csv_file(&[FULL_ROW]);

    let loader = RecordingLoader::failing(vec![TargetTable::ProjectRisks]);
    let pipeline = EtlPipeline::new(EtlConfig::default(), loader);
    let report = pipeline.run(file.path()).await.unwrap();

    // PROJECTS loaded before the risks failure and stays loaded
    assert_eq!(report.loaded_rows(TargetTable::Projects), Some(1));
    match outcome(&report, TargetTable::ProjectRisks) {
        LoadOutcome::Failed { reason, retryable } => {
            assert!(reason.contains("connectivity"));
            assert!(*retryable);
        },
        other => panic!("expected a failed risks load, got {:?}", other),
    }

    // Tables after the failing one still load
    assert_eq!(report.loaded_rows(TargetTable::ProjectMilestones), Some(1));
    assert_eq!(report.loaded_rows(TargetTable::ProjectDelays), Some(1));

    assert!(!report.succeeded());
    assert_eq!(report.failed_tables(), vec![TargetTable::ProjectRisks]);
}

#[tokio::test]
async fn test_referential_consistency_across_tables() {
    let rows = [FULL_ROW, FULL_ROW, FULL_ROW];
    let file = csv_file(&rows);

    let loader = RecordingLoader::default();
    let pipeline = EtlPipeline::new(EtlConfig::default(), loader);

    let keyed = pipeline.extract(file.path()).unwrap();
    let transformed = pipeline.transform(&keyed);

    let project_ids: HashSet<Uuid> =
        transformed.projects.iter().map(|p| p.project_id).collect();
    assert_eq!(project_ids.len(), 3);

    assert!(transformed
        .budgets
        .iter()
        .all(|b| project_ids.contains(&b.project_id)));
    assert!(transformed
        .risks
        .iter()
        .all(|r| project_ids.contains(&r.project_id)));
    assert!(transformed
        .milestones
        .iter()
        .all(|m| project_ids.contains(&m.project_id)));
    assert!(transformed
        .delays
        .iter()
        .all(|d| project_ids.contains(&d.project_id)));

    // Every delay references the milestone generated from its own row
    for delay in &transformed.delays {
        let sibling = transformed
            .milestones
            .iter()
            .find(|m| m.milestone_id == delay.milestone_id)
            .expect("delay references a generated milestone");
        assert_eq!(sibling.project_id, delay.project_id);
    }
}

#[tokio::test]
async fn test_reruns_generate_fresh_identifiers() {
    let file = csv_file(&[FULL_ROW]);

    let pipeline = EtlPipeline::new(EtlConfig::default(), RecordingLoader::default());

    let first = pipeline.transform(&pipeline.extract(file.path()).unwrap());
    let second = pipeline.transform(&pipeline.extract(file.path()).unwrap());

    assert_ne!(
        first.projects[0].project_id,
        second.projects[0].project_id
    );
    assert_ne!(first.budgets[0].budget_id, second.budgets[0].budget_id);
}

#[tokio::test]
async fn test_missing_column_aborts_before_any_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "PROJECT_NAME,PROJECT_TYPE").unwrap();
    writeln!(file, "Alpha,Infrastructure").unwrap();
    file.flush().unwrap();

    let loader = RecordingLoader::default();
    let pipeline = EtlPipeline::new(EtlConfig::default(), loader);
    let err = pipeline.run(file.path()).await.unwrap_err();

    assert!(matches!(err, SourceReadError::MissingColumn(_)));
}
