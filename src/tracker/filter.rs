use std::collections::BTreeSet;

use crate::lifecycle::Status;

use super::record::Record;

/// Issue-flag selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IssueFilter {
  #[default]
  All,
  Yes,
  No,
}

/// Panel filter. Empty sets match everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
  pub rooms: BTreeSet<String>,
  pub statuses: BTreeSet<Status>,
  pub issue: IssueFilter,
}

impl RecordFilter {
  pub fn matches(&self, record: &Record) -> bool {
    if !self.rooms.is_empty() && !self.rooms.contains(&record.room) {
      return false;
    }
    if !self.statuses.is_empty() && !self.statuses.contains(&record.status) {
      return false;
    }
    match self.issue {
      IssueFilter::All => true,
      IssueFilter::Yes => record.issue,
      IssueFilter::No => !record.issue,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::RowRef;

  fn record(room: &str, status: Status, issue: bool) -> Record {
    Record {
      row_ref: RowRef(1),
      id: "REQ-00001".to_string(),
      created_at: None,
      room: room.to_string(),
      work_order: String::new(),
      part_number: String::new(),
      lot_number: String::new(),
      quantity: Some(1),
      reason: "Proceso".to_string(),
      status,
      owner: String::new(),
      issue,
      frozen_minutes: None,
      note: String::new(),
    }
  }

  #[test]
  fn test_default_matches_everything() {
    let filter = RecordFilter::default();
    assert!(filter.matches(&record("PU1", Status::Pending, false)));
    assert!(filter.matches(&record("MMCL", Status::NotFound, true)));
  }

  #[test]
  fn test_filters_combine() {
    let filter = RecordFilter {
      rooms: ["PU1".to_string(), "PU2".to_string()].into_iter().collect(),
      statuses: [Status::Pending].into_iter().collect(),
      issue: IssueFilter::Yes,
    };
    assert!(filter.matches(&record("PU2", Status::Pending, true)));
    assert!(!filter.matches(&record("PU3", Status::Pending, true)));
    assert!(!filter.matches(&record("PU1", Status::Delivered, true)));
    assert!(!filter.matches(&record("PU1", Status::Pending, false)));
  }

  #[test]
  fn test_issue_no() {
    let filter = RecordFilter {
      issue: IssueFilter::No,
      ..RecordFilter::default()
    };
    assert!(filter.matches(&record("PU1", Status::Pending, false)));
    assert!(!filter.matches(&record("PU1", Status::Pending, true)));
  }
}
