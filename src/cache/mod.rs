//! Snapshot caching for reads from the remote table.
//!
//! This module provides:
//! - A single in-memory snapshot of every remote row with its fetch time
//! - TTL-based staleness checked on demand (no background refresh)
//! - Explicit invalidation after writes so the next read observes them

mod layer;
mod traits;

pub use layer::SnapshotCache;
