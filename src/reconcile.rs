//! Field-level diff between a fetched snapshot and locally edited rows.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Result, SyncError};
use crate::table::{Field, FieldValues, Row, RowUpdate};

/// Compute the minimal updates turning `original` into `edited`.
///
/// Rows pair up by `row_ref`. Only `editable` fields are compared, and each
/// update carries only the fields that differ. Rows without a counterpart
/// in `original` fail with `UnknownRow`; inserts go through `append`.
pub fn reconcile(
  original: &[Row],
  edited: &[Row],
  editable: &BTreeSet<Field>,
) -> Result<Vec<RowUpdate>> {
  let by_ref: HashMap<_, &Row> = original.iter().map(|r| (r.row_ref, r)).collect();
  let mut seen = HashSet::new();
  let mut updates = Vec::new();

  for row in edited {
    let before = by_ref
      .get(&row.row_ref)
      .ok_or(SyncError::UnknownRow(row.row_ref))?;
    if !seen.insert(row.row_ref) {
      return Err(SyncError::InvalidInput(format!(
        "row {} edited more than once",
        row.row_ref
      )));
    }

    let changes: FieldValues = editable
      .iter()
      .filter(|field| !before.get(**field).equivalent(row.get(**field)))
      .map(|field| (*field, row.get(*field).clone()))
      .collect();

    if !changes.is_empty() {
      updates.push(RowUpdate {
        row_ref: row.row_ref,
        changes,
      });
    }
  }

  Ok(updates)
}
