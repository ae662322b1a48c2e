//! Error types for the synchronization core.

use thiserror::Error;

use crate::table::RowRef;

/// Remote operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Schema,
  FetchAll,
  Append,
  Update,
}

impl std::fmt::Display for Operation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Operation::Schema => "schema",
      Operation::FetchAll => "fetch_all",
      Operation::Append => "append",
      Operation::Update => "update",
    };
    f.write_str(name)
  }
}

/// Error raised by the table client, the reconciler or the tracker.
#[derive(Debug, Error)]
pub enum SyncError {
  /// Transport, auth or timeout failure talking to the remote store
  #[error("remote table unavailable during {operation}{}: {reason}", fmt_row(.row_ref))]
  RemoteUnavailable {
    operation: Operation,
    row_ref: Option<RowRef>,
    reason: String,
  },

  /// Configured columns missing from the remote schema
  #[error("remote schema is missing columns: {}", .missing.join(", "))]
  SchemaMismatch { missing: Vec<String> },

  /// Edited row has no counterpart in the original snapshot
  #[error("row {0} is not part of the snapshot")]
  UnknownRow(RowRef),

  /// Identifier does not have the PREFIX-NNNNN shape
  #[error("malformed identifier: {0:?}")]
  MalformedIdentifier(String),

  /// Creation form or edit rejected before reaching the remote store
  #[error("invalid input: {0}")]
  InvalidInput(String),
}

impl SyncError {
  pub fn remote(operation: Operation, row_ref: Option<RowRef>, reason: impl Into<String>) -> Self {
    SyncError::RemoteUnavailable {
      operation,
      row_ref,
      reason: reason.into(),
    }
  }

  /// Whether retrying the same call may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, SyncError::RemoteUnavailable { .. })
  }
}

fn fmt_row(row_ref: &Option<RowRef>) -> String {
  row_ref
    .map(|r| format!(" (row {})", r))
    .unwrap_or_default()
}

/// Result type for the synchronization core
pub type Result<T> = std::result::Result<T, SyncError>;
