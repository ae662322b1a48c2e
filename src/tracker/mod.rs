//! Record tracking on top of the remote table.
//!
//! `Tracker` is what callers talk to: it reads through the snapshot cache,
//! annotates records with elapsed time, creates records with consecutive
//! identifiers, and turns caller-held edits into minimal row updates.

mod export;
mod filter;
mod record;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::SnapshotCache;
use crate::config::{Config, RecordsConfig};
use crate::error::{Result, SyncError};
use crate::ids::IdGenerator;
use crate::lifecycle::{BusinessClock, Status};
use crate::reconcile::reconcile;
use crate::table::{Field, RemoteTable, Row, RowRef, RowUpdate};

pub use export::{export_rows, ExportRow};
pub use filter::{IssueFilter, RecordFilter};
pub use record::{NewRecord, PendingEdits, Record, RecordEdit, TrackedRecord};

pub struct Tracker<T: RemoteTable> {
  table: Arc<T>,
  cache: SnapshotCache<T>,
  ids: IdGenerator,
  clock: BusinessClock,
  records: RecordsConfig,
  editable: BTreeSet<Field>,
  /// Serializes id generation with the append that consumes the id
  create_lock: Mutex<()>,
}

impl<T: RemoteTable> Tracker<T> {
  pub fn new(table: Arc<T>, config: &Config, clock: BusinessClock) -> Self {
    let cache = SnapshotCache::new(Arc::clone(&table))
      .with_ttl(Duration::from_secs(config.cache.ttl_secs));

    let editable = Field::EDITABLE
      .into_iter()
      .filter(|f| *f != Field::Note || config.columns.note.is_some())
      .collect();

    Self {
      table,
      cache,
      ids: IdGenerator::new(config.records.id_prefix.clone()),
      clock,
      records: config.records.clone(),
      editable,
      create_lock: Mutex::new(()),
    }
  }

  pub fn clock(&self) -> &BusinessClock {
    &self.clock
  }

  /// Every record, annotated as of now, newest first.
  ///
  /// Blank rows and rows without an identifier are dropped. Terminal
  /// records that were never frozen report their live count; persisting it
  /// is `freeze_terminal`'s job.
  pub async fn records(&self, force_refresh: bool) -> Result<Vec<TrackedRecord>> {
    let result = self.cache.get(force_refresh).await?;
    debug!(source = ?result.source, fetched_at = %result.fetched_at, "snapshot");
    let snapshot = result.data;
    let now = self.clock.now();

    let mut records: Vec<TrackedRecord> = snapshot
      .rows
      .iter()
      .filter(|row| !row.is_blank())
      .filter_map(|row| match Record::from_row(row, &self.clock) {
        Some(record) => Some(TrackedRecord::new(record, row.clone(), now)),
        None => {
          debug!(row_ref = %row.row_ref, "row has no identifier, skipped");
          None
        }
      })
      .collect();

    records.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
    Ok(records)
  }

  /// Records passing `filter`, newest first.
  pub async fn filtered(&self, filter: &RecordFilter, force_refresh: bool) -> Result<Vec<TrackedRecord>> {
    let mut records = self.records(force_refresh).await?;
    records.retain(|tracked| filter.matches(&tracked.record));
    Ok(records)
  }

  /// Look up a record by its human-readable identifier.
  pub async fn find(&self, id: &str) -> Result<Option<TrackedRecord>> {
    let records = self.records(false).await?;
    Ok(records.into_iter().find(|tracked| tracked.record.id == id))
  }

  /// Create a record with the next identifier.
  ///
  /// Identifier generation reads a fresh snapshot and the append follows
  /// under the same lock, so creations through one tracker never collide.
  /// Other writers to the same sheet can still race. The form is only
  /// borrowed, so a failed append can be retried with the same form.
  pub async fn create(&self, form: &NewRecord) -> Result<Record> {
    form.validate(&self.records)?;

    let _guard = self.create_lock.lock().await;
    let id = self.next_id().await?;

    let created_at = self.clock.format(self.clock.now());
    let mut fields = form.to_fields(&id, &created_at);
    // Without a note column the note is never stored
    if !self.editable.contains(&Field::Note) {
      fields.remove(&Field::Note);
    }
    let row_ref = self.table.append(&fields).await?;
    self.cache.invalidate().await;

    info!(%id, %row_ref, "created record");
    let row = Row {
      row_ref,
      cells: fields,
    };
    Record::from_row(&row, &self.clock).ok_or(SyncError::MalformedIdentifier(id))
  }

  /// The identifier the next `create` would assign, from a fresh read.
  pub async fn peek_next_id(&self) -> Result<String> {
    let _guard = self.create_lock.lock().await;
    self.next_id().await
  }

  async fn next_id(&self) -> Result<String> {
    let snapshot = self.cache.get(true).await?.data;
    let existing: Vec<String> = snapshot
      .rows
      .iter()
      .map(|row| row.get(Field::Id).as_text().trim().to_string())
      .collect();
    Ok(self.ids.next_id(existing.iter().map(String::as_str)))
  }

  /// Apply caller-held edits and write the resulting changes.
  ///
  /// The edit set is only borrowed: on failure it is left as it was so the
  /// caller can retry. Returns the updates that were sent.
  pub async fn apply_edits(&self, edits: &PendingEdits) -> Result<Vec<RowUpdate>> {
    if edits.is_empty() {
      return Ok(Vec::new());
    }

    let snapshot = self.cache.get(false).await?.data;
    let now = self.clock.now();
    let by_ref: HashMap<RowRef, &Row> = snapshot.rows.iter().map(|r| (r.row_ref, r)).collect();

    let mut edited = Vec::with_capacity(edits.len());
    for (row_ref, edit) in edits {
      let original = by_ref
        .get(row_ref)
        .copied()
        .ok_or(SyncError::UnknownRow(*row_ref))?;
      let record =
        Record::from_row(original, &self.clock).ok_or(SyncError::UnknownRow(*row_ref))?;
      edited.push(edit.apply(&record, original, now));
    }

    let updates = reconcile(&snapshot.rows, &edited, &self.editable)?;
    self.write(&updates).await?;
    Ok(updates)
  }

  /// Move one record to `status`, settling its frozen minutes.
  pub async fn change_status(&self, row_ref: RowRef, status: Status) -> Result<Vec<RowUpdate>> {
    let mut edits = PendingEdits::new();
    edits.insert(
      row_ref,
      RecordEdit {
        status: Some(status),
        ..RecordEdit::default()
      },
    );
    self.apply_edits(&edits).await
  }

  /// Persist the elapsed minutes of terminal records that were never frozen.
  pub async fn freeze_terminal(&self) -> Result<Vec<RowUpdate>> {
    let records = self.records(false).await?;

    let (originals, edited): (Vec<Row>, Vec<Row>) = records
      .into_iter()
      .filter(|tracked| tracked.record.needs_freeze())
      .map(|tracked| {
        let frozen = tracked
          .row
          .clone()
          .with(Field::FrozenMinutes, tracked.elapsed_minutes);
        (tracked.row, frozen)
      })
      .unzip();

    let updates = reconcile(&originals, &edited, &self.editable)?;
    self.write(&updates).await?;
    Ok(updates)
  }

  /// Send updates in order, stopping at the first failure. The cache is
  /// invalidated whenever at least one write landed.
  async fn write(&self, updates: &[RowUpdate]) -> Result<()> {
    let mut written = 0;
    for update in updates {
      if let Err(e) = self.table.update(update.row_ref, &update.changes).await {
        if written > 0 {
          self.cache.invalidate().await;
        }
        return Err(e);
      }
      written += 1;
      info!(row_ref = %update.row_ref, fields = update.changes.len(), "updated record");
    }
    if written > 0 {
      self.cache.invalidate().await;
    }
    Ok(())
  }
}
