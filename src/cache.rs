//! ReadCache - memoized numbered view of the record store.
//!
//! Holds at most one snapshot. Any mutation drops it whole; it is never
//! patched in place, because one insert or delete can renumber every later
//! day. A generation counter keeps a rebuild that raced with an invalidation
//! from installing a stale snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::error::StoreError;
use crate::record::{DayRecord, NumberedDay};
use crate::sequencer::DerivedSequencer;

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<Vec<NumberedDay>>>,
    generation: u64,
}

/// Owned by the read path. Writers may only call [`ReadCache::invalidate`].
#[derive(Default)]
pub struct ReadCache {
    state: RwLock<CacheState>,
    rebuilds: AtomicU64,
}

impl ReadCache {
    pub fn new() -> Self {
        Self::default()
    }

    // The cache only holds derived data, so a poisoned lock is still safe to use.
    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Drop the snapshot. Visible to every reader as soon as this returns.
    pub fn invalidate(&self) {
        let mut state = self.write_state();
        state.snapshot = None;
        state.generation += 1;
    }

    /// Whether a snapshot is currently held.
    pub fn is_warm(&self) -> bool {
        self.read_state().snapshot.is_some()
    }

    /// Number of full rebuilds performed so far.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }

    /// Return a private copy of the numbered view, rebuilding it from `load`
    /// when no snapshot is held.
    pub fn get_or_rebuild<F>(&self, load: F) -> Result<Vec<NumberedDay>, StoreError>
    where
        F: FnOnce() -> Result<Vec<DayRecord>, StoreError>,
    {
        let generation = {
            let state = self.read_state();
            if let Some(snapshot) = &state.snapshot {
                return Ok(snapshot.as_ref().clone());
            }
            state.generation
        };

        let numbered = DerivedSequencer::number(load()?);
        self.rebuilds.fetch_add(1, Ordering::Relaxed);

        let mut state = self.write_state();
        if state.generation == generation {
            debug!("read cache rebuilt with {} days", numbered.len());
            state.snapshot = Some(Arc::new(numbered.clone()));
        } else {
            debug!("discarding read cache rebuild overtaken by a mutation");
        }
        Ok(numbered)
    }
}
