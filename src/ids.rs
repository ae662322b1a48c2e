//! Consecutive record identifiers of the form `PREFIX-NNNNN`.
//!
//! The generator scans the identifiers already present and returns the next
//! one. It takes no lock: two callers scanning the same snapshot get the same
//! identifier, so generation and the append consuming it must run inside one
//! critical section (see `Tracker::create`).

use tracing::debug;

use crate::error::{Result, SyncError};

/// Digits in the numeric suffix
const WIDTH: usize = 5;

#[derive(Debug, Clone)]
pub struct IdGenerator {
  prefix: String,
}

impl IdGenerator {
  pub fn new(prefix: impl Into<String>) -> Self {
    Self {
      prefix: prefix.into(),
    }
  }

  /// Numeric suffix of an identifier with this generator's prefix.
  pub fn parse(&self, id: &str) -> Result<u64> {
    let suffix = id
      .trim()
      .strip_prefix(self.prefix.as_str())
      .and_then(|rest| rest.strip_prefix('-'))
      .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
      .ok_or_else(|| SyncError::MalformedIdentifier(id.to_string()))?;

    suffix
      .parse::<u64>()
      .map_err(|_| SyncError::MalformedIdentifier(id.to_string()))
  }

  pub fn format(&self, sequence: u64) -> String {
    format!("{}-{:0width$}", self.prefix, sequence, width = WIDTH)
  }

  /// Next identifier after the highest well-formed one in `existing`.
  /// Malformed identifiers are skipped.
  pub fn next_id<'a, I>(&self, existing: I) -> String
  where
    I: IntoIterator<Item = &'a str>,
  {
    let max = existing
      .into_iter()
      .filter(|id| !id.is_empty())
      .filter_map(|id| match self.parse(id) {
        Ok(n) => Some(n),
        Err(e) => {
          debug!(error = %e, "skipping identifier");
          None
        }
      })
      .max();

    self.format(max.map_or(1, |n| n + 1))
  }
}
