//! In-memory table for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Operation, Result, SyncError};

use super::types::{FieldValues, Row, RowRef};
use super::RemoteTable;

#[derive(Default)]
pub struct MemoryTable {
  rows: Mutex<Vec<Row>>,
  next_ref: AtomicU64,
  fetches: AtomicUsize,
  updates: AtomicUsize,
  fail_writes: AtomicBool,
}

impl MemoryTable {
  pub fn with_rows(rows: Vec<Row>) -> Self {
    let next = rows.iter().map(|r| r.row_ref.0).max().unwrap_or(0) + 1;
    Self {
      rows: Mutex::new(rows),
      next_ref: AtomicU64::new(next),
      ..Self::default()
    }
  }

  pub fn fetch_count(&self) -> usize {
    self.fetches.load(Ordering::SeqCst)
  }

  pub fn update_count(&self) -> usize {
    self.updates.load(Ordering::SeqCst)
  }

  pub fn set_fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }

  pub fn rows(&self) -> Vec<Row> {
    self.rows.lock().unwrap().clone()
  }

  pub fn row(&self, row_ref: RowRef) -> Option<Row> {
    self.rows().into_iter().find(|r| r.row_ref == row_ref)
  }
}

#[async_trait]
impl RemoteTable for MemoryTable {
  async fn fetch_all(&self) -> Result<Vec<Row>> {
    self.fetches.fetch_add(1, Ordering::SeqCst);
    tokio::task::yield_now().await;
    Ok(self.rows())
  }

  async fn append(&self, fields: &FieldValues) -> Result<RowRef> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(SyncError::remote(Operation::Append, None, "connection refused"));
    }
    let row_ref = RowRef(self.next_ref.fetch_add(1, Ordering::SeqCst));
    let row = Row {
      row_ref,
      cells: fields.clone(),
    };
    self.rows.lock().unwrap().insert(0, row);
    Ok(row_ref)
  }

  async fn update(&self, row_ref: RowRef, fields: &FieldValues) -> Result<()> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(SyncError::remote(Operation::Update, Some(row_ref), "connection refused"));
    }
    let mut rows = self.rows.lock().unwrap();
    let row = rows
      .iter_mut()
      .find(|r| r.row_ref == row_ref)
      .ok_or_else(|| SyncError::remote(Operation::Update, Some(row_ref), "HTTP 404"))?;
    for (field, value) in fields {
      row.cells.insert(*field, value.clone());
    }
    self.updates.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}
