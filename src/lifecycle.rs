//! Status lifecycle and elapsed-time tracking.
//!
//! Elapsed minutes run from a record's creation until it first reaches a
//! terminal status, where the count is frozen. A frozen value is returned
//! verbatim on every later read and is only erased by an explicit move back
//! to a non-terminal status.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, SyncError};

/// Wire format of `created_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Minutes at which freshness turns yellow
const YELLOW_FROM: i64 = 60;
/// Minutes at which freshness turns red
const RED_FROM: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
  Pending,
  InProgress,
  Delivered,
  Cancelled,
  NotFound,
}

impl Status {
  pub const ALL: [Status; 5] = [
    Status::Pending,
    Status::InProgress,
    Status::Delivered,
    Status::Cancelled,
    Status::NotFound,
  ];

  pub fn is_terminal(&self) -> bool {
    matches!(self, Status::Delivered | Status::Cancelled | Status::NotFound)
  }

  /// Label stored in the remote table
  pub fn label(&self) -> &'static str {
    match self {
      Status::Pending => "Pendiente",
      Status::InProgress => "En proceso",
      Status::Delivered => "Entregado",
      Status::Cancelled => "Cancelado",
      Status::NotFound => "No encontrado",
    }
  }

  fn name(&self) -> &'static str {
    match self {
      Status::Pending => "pending",
      Status::InProgress => "in-progress",
      Status::Delivered => "delivered",
      Status::Cancelled => "cancelled",
      Status::NotFound => "not-found",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for Status {
  type Err = SyncError;

  /// Accepts remote labels and kebab-case names, case-insensitively.
  fn from_str(s: &str) -> Result<Self> {
    let wanted = s.trim().to_lowercase();
    Status::ALL
      .into_iter()
      .find(|status| status.label().to_lowercase() == wanted || status.name() == wanted)
      .ok_or_else(|| SyncError::InvalidInput(format!("unknown status {:?}", s)))
  }
}

/// Three-level age indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
  Green,
  Yellow,
  Red,
}

impl Freshness {
  /// Each band includes its lower bound.
  pub fn from_minutes(minutes: i64) -> Self {
    if minutes >= RED_FROM {
      Freshness::Red
    } else if minutes >= YELLOW_FROM {
      Freshness::Yellow
    } else {
      Freshness::Green
    }
  }

  pub fn symbol(&self) -> &'static str {
    match self {
      Freshness::Green => "🟢",
      Freshness::Yellow => "🟡",
      Freshness::Red => "🔴",
    }
  }
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
  fn now_utc(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
  fn now_utc(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock pinned to the business timezone's fixed offset.
#[derive(Clone)]
pub struct BusinessClock {
  offset: FixedOffset,
  source: Arc<dyn Clock>,
}

impl BusinessClock {
  pub fn new(utc_offset_hours: i32) -> Result<Self> {
    Self::with_source(utc_offset_hours, Arc::new(SystemClock))
  }

  pub fn with_source(utc_offset_hours: i32, source: Arc<dyn Clock>) -> Result<Self> {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
      SyncError::InvalidInput(format!("invalid UTC offset: {} hours", utc_offset_hours))
    })?;
    Ok(Self { offset, source })
  }

  pub fn now(&self) -> DateTime<FixedOffset> {
    self.source.now_utc().with_timezone(&self.offset)
  }

  pub fn format(&self, at: DateTime<FixedOffset>) -> String {
    at.with_timezone(&self.offset)
      .format(TIMESTAMP_FORMAT)
      .to_string()
  }

  /// Parse a stored timestamp. Naive timestamps are read in the business
  /// offset; RFC 3339 timestamps keep their own offset.
  pub fn parse(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
      return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
      return Some(dt.with_timezone(&self.offset));
    }
    [
      TIMESTAMP_FORMAT,
      "%Y-%m-%dT%H:%M:%S",
      "%Y-%m-%d %H:%M:%S%.f",
      "%Y-%m-%dT%H:%M:%S%.f",
      "%Y-%m-%d %H:%M",
    ]
      .iter()
      .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
      .and_then(|naive| naive.and_local_timezone(self.offset).single())
  }
}

/// Elapsed minutes for a record.
///
/// 1. Missing creation time reads as 0.
/// 2. A frozen value is returned unchanged.
/// 3. Otherwise whole minutes since creation, truncated. Creation times in
///    the future read as 0.
pub fn elapsed_minutes(
  created_at: Option<DateTime<FixedOffset>>,
  frozen_minutes: Option<i64>,
  now: DateTime<FixedOffset>,
) -> i64 {
  let Some(created_at) = created_at else {
    return 0;
  };
  if let Some(frozen) = frozen_minutes {
    return frozen;
  }
  (now - created_at).num_minutes().max(0)
}

/// Frozen minutes a record carries after an explicit move to `next`.
///
/// Terminal targets keep an existing frozen value or freeze the current
/// elapsed minutes. Non-terminal targets clear it.
pub fn frozen_after_transition(
  next: Status,
  created_at: Option<DateTime<FixedOffset>>,
  frozen_minutes: Option<i64>,
  now: DateTime<FixedOffset>,
) -> Option<i64> {
  if !next.is_terminal() {
    return None;
  }
  Some(frozen_minutes.unwrap_or_else(|| elapsed_minutes(created_at, None, now)))
}

#[cfg(test)]
pub mod testing {
  use super::*;
  use std::sync::Mutex;

  /// Clock that only moves when told to
  pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
  }

  impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
      Arc::new(Self {
        now: Mutex::new(now),
      })
    }

    pub fn advance(&self, by: chrono::Duration) {
      let mut now = self.now.lock().unwrap();
      *now += by;
    }
  }

  impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
      *self.now.lock().unwrap()
    }
  }

  pub fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-10T22:00:00Z")
      .unwrap()
      .with_timezone(&Utc)
  }
}
