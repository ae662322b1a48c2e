use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use tracing::warn;

use crate::config::RecordsConfig;
use crate::error::{Result, SyncError};
use crate::lifecycle::{self, BusinessClock, Freshness, Status};
use crate::table::{CellValue, Field, FieldValues, Row, RowRef};

/// Tracked work item parsed from a remote row
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
  pub row_ref: RowRef,
  pub id: String,
  pub created_at: Option<DateTime<FixedOffset>>,
  pub room: String,
  pub work_order: String,
  pub part_number: String,
  pub lot_number: String,
  pub quantity: Option<u32>,
  pub reason: String,
  pub status: Status,
  pub owner: String,
  pub issue: bool,
  pub frozen_minutes: Option<i64>,
  pub note: String,
}

impl Record {
  /// Parse a row. Rows without an identifier are not records.
  pub fn from_row(row: &Row, clock: &BusinessClock) -> Option<Self> {
    let id = row.get(Field::Id).as_text().trim().to_string();
    if id.is_empty() {
      return None;
    }

    let raw_created = row.get(Field::CreatedAt).as_text();
    let created_at = clock.parse(&raw_created);
    if created_at.is_none() && !raw_created.is_empty() {
      warn!(%id, created_at = %raw_created, "unparseable creation time");
    }

    let raw_status = row.get(Field::Status).as_text();
    let status = raw_status.parse().unwrap_or_else(|_| {
      warn!(%id, status = %raw_status, "unknown status, reading as pending");
      Status::Pending
    });

    Some(Self {
      row_ref: row.row_ref,
      id,
      created_at,
      room: row.get(Field::Room).as_text(),
      work_order: row.get(Field::WorkOrder).as_text(),
      part_number: row.get(Field::PartNumber).as_text(),
      lot_number: row.get(Field::LotNumber).as_text(),
      quantity: row
        .get(Field::Quantity)
        .as_integer()
        .and_then(|n| u32::try_from(n).ok()),
      reason: row.get(Field::Reason).as_text(),
      status,
      owner: row.get(Field::Owner).as_text(),
      issue: row.get(Field::Issue).as_bool().unwrap_or(false),
      frozen_minutes: row.get(Field::FrozenMinutes).as_integer(),
      note: row.get(Field::Note).as_text(),
    })
  }

  pub fn elapsed_minutes(&self, now: DateTime<FixedOffset>) -> i64 {
    lifecycle::elapsed_minutes(self.created_at, self.frozen_minutes, now)
  }

  pub fn freshness(&self, now: DateTime<FixedOffset>) -> Freshness {
    Freshness::from_minutes(self.elapsed_minutes(now))
  }

  /// Terminal but never frozen: the current elapsed value still has to be
  /// written back.
  pub fn needs_freeze(&self) -> bool {
    self.status.is_terminal() && self.frozen_minutes.is_none() && self.created_at.is_some()
  }
}

/// Creation form
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
  pub room: String,
  pub work_order: String,
  pub part_number: String,
  pub lot_number: String,
  pub quantity: u32,
  pub reason: String,
  pub note: Option<String>,
}

impl NewRecord {
  pub fn validate(&self, config: &RecordsConfig) -> Result<()> {
    if !config.rooms.iter().any(|r| r == self.room.trim()) {
      return Err(SyncError::InvalidInput(format!("unknown room {:?}", self.room)));
    }
    if !config.reasons.iter().any(|r| r == self.reason.trim()) {
      return Err(SyncError::InvalidInput(format!("unknown reason {:?}", self.reason)));
    }
    if self.quantity == 0 {
      return Err(SyncError::InvalidInput("quantity must be at least 1".to_string()));
    }
    Ok(())
  }

  /// Cells of the new row: pending, no owner, no issue, not frozen.
  pub fn to_fields(&self, id: &str, created_at: &str) -> FieldValues {
    let mut fields = FieldValues::new();
    fields.insert(Field::Id, CellValue::text(id));
    fields.insert(Field::CreatedAt, CellValue::text(created_at));
    fields.insert(Field::Room, CellValue::text(self.room.trim()));
    fields.insert(Field::WorkOrder, CellValue::text(self.work_order.trim()));
    fields.insert(Field::PartNumber, CellValue::text(self.part_number.trim()));
    fields.insert(Field::LotNumber, CellValue::text(self.lot_number.trim()));
    fields.insert(Field::Quantity, CellValue::from(self.quantity));
    fields.insert(Field::Reason, CellValue::text(self.reason.trim()));
    fields.insert(Field::Status, CellValue::text(Status::Pending.label()));
    fields.insert(Field::Owner, CellValue::Empty);
    fields.insert(Field::Issue, CellValue::Bool(false));
    fields.insert(Field::FrozenMinutes, CellValue::Empty);
    if let Some(note) = &self.note {
      fields.insert(Field::Note, CellValue::text(note.as_str()));
    }
    fields
  }
}

/// Proposed changes to one record. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordEdit {
  pub status: Option<Status>,
  pub owner: Option<String>,
  pub issue: Option<bool>,
  pub note: Option<String>,
}

impl RecordEdit {
  pub fn is_empty(&self) -> bool {
    self.status.is_none() && self.owner.is_none() && self.issue.is_none() && self.note.is_none()
  }

  /// Edited copy of `original`. A status change also settles the frozen
  /// minutes per the lifecycle transition rule.
  pub fn apply(&self, record: &Record, original: &Row, now: DateTime<FixedOffset>) -> Row {
    let mut row = original.clone();
    if let Some(status) = self.status {
      row.set(Field::Status, status.label());
      let frozen =
        lifecycle::frozen_after_transition(status, record.created_at, record.frozen_minutes, now);
      row.set(Field::FrozenMinutes, frozen);
    }
    if let Some(owner) = &self.owner {
      row.set(Field::Owner, owner.trim());
    }
    if let Some(issue) = self.issue {
      row.set(Field::Issue, issue);
    }
    if let Some(note) = &self.note {
      row.set(Field::Note, note.as_str());
    }
    row
  }
}

/// Caller-held edits keyed by row, alive between a fetch and a reconcile
pub type PendingEdits = BTreeMap<RowRef, RecordEdit>;

/// Record annotated with its elapsed time, as seen at one instant
#[derive(Debug, Clone)]
pub struct TrackedRecord {
  pub record: Record,
  /// Row as fetched, the baseline for reconciliation
  pub row: Row,
  pub elapsed_minutes: i64,
  pub freshness: Freshness,
}

impl TrackedRecord {
  pub fn new(record: Record, row: Row, now: DateTime<FixedOffset>) -> Self {
    let elapsed_minutes = record.elapsed_minutes(now);
    Self {
      freshness: record.freshness(now),
      record,
      row,
      elapsed_minutes,
    }
  }
}
