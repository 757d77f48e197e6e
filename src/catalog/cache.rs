//! Read-through snapshot cache with time-based invalidation.
//!
//! Holds at most one [`CatalogSnapshot`] and its load instant. `get_current`
//! returns the held snapshot while it is younger than the TTL and reloads
//! through the [`SnapshotSource`] otherwise — the only path that produces or
//! refreshes a snapshot.
//!
//! Concurrency: the lock is released across the reload await, so callers that
//! expire simultaneously may reload redundantly; each reload completes
//! independently and the last write wins. `invalidate` racing an in-flight
//! `get_current` only guarantees that the *next* call reloads.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::catalog::loader::SnapshotSource;
use crate::models::CatalogSnapshot;

struct CacheSlot {
    snapshot: Arc<CatalogSnapshot>,
    fetched_at: Instant,
}

/// Component-owned snapshot cache.
pub struct CatalogCache {
    source: Arc<dyn SnapshotSource>,
    ttl: Duration,
    slot: RwLock<Option<CacheSlot>>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn SnapshotSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Return the current snapshot, reloading it when stale or absent.
    pub async fn get_current(&self) -> Arc<CatalogSnapshot> {
        {
            let guard = self.slot.read().expect("catalog cache lock poisoned");
            if let Some(slot) = guard.as_ref() {
                if slot.fetched_at.elapsed() < self.ttl {
                    return Arc::clone(&slot.snapshot);
                }
            }
        }

        let snapshot = Arc::new(self.source.load().await);

        let mut guard = self.slot.write().expect("catalog cache lock poisoned");
        *guard = Some(CacheSlot {
            snapshot: Arc::clone(&snapshot),
            fetched_at: Instant::now(),
        });
        snapshot
    }

    /// Drop the held snapshot, forcing the next `get_current` to reload.
    ///
    /// Idempotent; a no-op when nothing is cached.
    pub fn invalidate(&self) {
        let mut guard = self.slot.write().expect("catalog cache lock poisoned");
        *guard = None;
    }

    /// Whether a snapshot is held and still within its TTL.
    pub fn is_valid(&self) -> bool {
        let guard = self.slot.read().expect("catalog cache lock poisoned");
        guard
            .as_ref()
            .is_some_and(|slot| slot.fetched_at.elapsed() < self.ttl)
    }
}
