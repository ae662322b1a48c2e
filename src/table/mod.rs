//! Typed access to the remote table of record.
//!
//! `RemoteTable` is the seam between the synchronization core and the
//! concrete store. `SmartsheetClient` is the production implementation.

mod api_types;
mod client;
mod columns;
#[cfg(test)]
pub mod memory;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::SmartsheetClient;
pub use types::{CellValue, Field, FieldValues, Row, RowRef, RowUpdate};

/// Remote key-indexed tabular store.
#[async_trait]
pub trait RemoteTable: Send + Sync {
  /// Fetch every row with its reference and mapped cell values.
  async fn fetch_all(&self) -> Result<Vec<Row>>;

  /// Insert a row and return its reference.
  async fn append(&self, fields: &FieldValues) -> Result<RowRef>;

  /// Replace only the named cells of a row.
  async fn update(&self, row_ref: RowRef, fields: &FieldValues) -> Result<()>;
}
