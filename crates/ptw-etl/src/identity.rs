//! Surrogate identity assignment
//!
//! Every source row gets one random `project_id` before any transformer
//! runs, so all five transformers see the same join key for a given row.
//! Identifiers are stable within a run only; a rerun over the same input
//! produces a fresh set.

use crate::source::SourceRow;
use uuid::Uuid;

/// A source row with its assigned surrogate project identifier.
#[derive(Debug, Clone)]
pub struct KeyedRow {
    /// Zero-based index of the row in the source export, kept for
    /// rejection reporting.
    pub row_index: usize,

    /// Surrogate join key shared by every derived child row.
    pub project_id: Uuid,

    pub row: SourceRow,
}

/// Attach a fresh `project_id` to every source row.
pub fn assign_project_ids(rows: Vec<SourceRow>) -> Vec<KeyedRow> {
    rows.into_iter()
        .enumerate()
        .map(|(row_index, row)| KeyedRow {
            row_index,
            project_id: Uuid::new_v4(),
            row,
        })
        .collect()
}
