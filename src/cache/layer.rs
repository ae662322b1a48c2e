//! Snapshot cache in front of the remote table.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::table::{RemoteTable, Row};

use super::traits::CacheResult;

/// Every row of the remote table as of one fetch.
#[derive(Debug)]
pub struct Snapshot {
  pub rows: Vec<Row>,
  pub fetched_at: DateTime<Utc>,
}

struct Entry {
  snapshot: Arc<Snapshot>,
  fetched: Instant,
}

/// Holds the last fetched snapshot and refetches once it is older than
/// the TTL or after an explicit invalidation.
///
/// Lookups are serialized: the lock is held across the remote fetch, so
/// concurrent callers wait for one fetch instead of issuing their own, and
/// nobody observes a half-replaced snapshot.
pub struct SnapshotCache<T: RemoteTable> {
  table: Arc<T>,
  /// How long before a snapshot is considered stale
  ttl: Duration,
  entry: Mutex<Option<Entry>>,
}

impl<T: RemoteTable> SnapshotCache<T> {
  /// Create a new cache over the given table.
  pub fn new(table: Arc<T>) -> Self {
    Self {
      table,
      ttl: Duration::from_secs(15),
      entry: Mutex::new(None),
    }
  }

  /// Set the time-to-live for snapshots.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  fn is_stale(&self, fetched: Instant) -> bool {
    fetched.elapsed() > self.ttl
  }

  /// Current snapshot.
  ///
  /// 1. If a snapshot exists, is within the TTL and no refresh is forced, return it
  /// 2. Otherwise fetch every row, store it and return it
  ///
  /// A failed fetch is returned to the caller and leaves any stored
  /// snapshot in place.
  pub async fn get(&self, force_refresh: bool) -> Result<CacheResult<Arc<Snapshot>>> {
    let mut entry = self.entry.lock().await;

    if !force_refresh {
      if let Some(cached) = entry.as_ref() {
        if !self.is_stale(cached.fetched) {
          debug!(rows = cached.snapshot.rows.len(), "snapshot cache hit");
          return Ok(CacheResult::from_cache(
            Arc::clone(&cached.snapshot),
            cached.snapshot.fetched_at,
          ));
        }
      }
    }

    debug!(force_refresh, "snapshot cache miss, fetching");
    let rows = self.table.fetch_all().await?;
    let snapshot = Arc::new(Snapshot {
      rows,
      fetched_at: Utc::now(),
    });
    *entry = Some(Entry {
      snapshot: Arc::clone(&snapshot),
      fetched: Instant::now(),
    });

    let fetched_at = snapshot.fetched_at;
    Ok(CacheResult::from_network(snapshot, fetched_at))
  }

  /// Drop the stored snapshot so the next `get` refetches.
  pub async fn invalidate(&self) {
    let mut entry = self.entry.lock().await;
    if entry.take().is_some() {
      debug!("snapshot cache invalidated");
    }
  }
}
