//! Flat rows for reporting collaborators.

use serde::Serialize;

use crate::lifecycle::{Freshness, Status, TIMESTAMP_FORMAT};

use super::record::TrackedRecord;

/// One record flattened for tabular output. Field order is column order.
/// The row reference and raw frozen minutes stay internal.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
  pub id: String,
  pub created_at: String,
  pub room: String,
  pub work_order: String,
  pub part_number: String,
  pub lot_number: String,
  pub quantity: Option<u32>,
  pub reason: String,
  pub status: Status,
  pub owner: String,
  pub issue: bool,
  pub note: String,
  pub elapsed_minutes: i64,
  pub freshness: Freshness,
}

impl ExportRow {
  pub const COLUMNS: [&'static str; 14] = [
    "id",
    "created_at",
    "room",
    "work_order",
    "part_number",
    "lot_number",
    "quantity",
    "reason",
    "status",
    "owner",
    "issue",
    "note",
    "elapsed_minutes",
    "freshness",
  ];

  /// Display text of each column, in `COLUMNS` order.
  pub fn cells(&self) -> Vec<String> {
    vec![
      self.id.clone(),
      self.created_at.clone(),
      self.room.clone(),
      self.work_order.clone(),
      self.part_number.clone(),
      self.lot_number.clone(),
      self.quantity.map(|q| q.to_string()).unwrap_or_default(),
      self.reason.clone(),
      self.status.label().to_string(),
      self.owner.clone(),
      if self.issue { "yes" } else { "no" }.to_string(),
      self.note.clone(),
      self.elapsed_minutes.to_string(),
      self.freshness.symbol().to_string(),
    ]
  }
}

impl From<&TrackedRecord> for ExportRow {
  fn from(tracked: &TrackedRecord) -> Self {
    let r = &tracked.record;
    Self {
      id: r.id.clone(),
      created_at: r
        .created_at
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default(),
      room: r.room.clone(),
      work_order: r.work_order.clone(),
      part_number: r.part_number.clone(),
      lot_number: r.lot_number.clone(),
      quantity: r.quantity,
      reason: r.reason.clone(),
      status: r.status,
      owner: r.owner.clone(),
      issue: r.issue,
      note: r.note.clone(),
      elapsed_minutes: tracked.elapsed_minutes,
      freshness: tracked.freshness,
    }
  }
}

pub fn export_rows(records: &[TrackedRecord]) -> Vec<ExportRow> {
  records.iter().map(ExportRow::from).collect()
}
