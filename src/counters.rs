//! Debug counters for the locking protocol.
//!
//! Process-wide, relaxed, and only meant for diagnostics and tests: they
//! show how often the slow paths of the protocol actually ran.

use std::sync::atomic::AtomicUsize;

use crate::ordering::RELAXED;

/// Lookups that ran in checkmode because a deletion was in progress.
pub static CHECKMODE_WALK_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Lookups answered from the plant's quickptr hint.
pub static QUICKPTR_HIT_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Second-pass rescans that found a key inserted by a racing thread.
pub static INSERT_RACE_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Updates aborted because the leaf was being deleted.
pub static CONCURRENCY_ABORT_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Unlinked leaves freed directly by the deleting thread.
pub static IMMEDIATE_RECLAIM_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Unlinked leaves left for the last reference holder to free.
pub static DEFERRED_RECLAIM_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Snapshot of all debug counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugCounters {
    /// See [`CHECKMODE_WALK_COUNT`].
    pub checkmode_walks: usize,
    /// See [`QUICKPTR_HIT_COUNT`].
    pub quickptr_hits: usize,
    /// See [`INSERT_RACE_COUNT`].
    pub insert_races: usize,
    /// See [`CONCURRENCY_ABORT_COUNT`].
    pub concurrency_aborts: usize,
    /// See [`IMMEDIATE_RECLAIM_COUNT`].
    pub immediate_reclaims: usize,
    /// See [`DEFERRED_RECLAIM_COUNT`].
    pub deferred_reclaims: usize,
}

/// Read every counter.
#[must_use]
pub fn debug_counters() -> DebugCounters {
    DebugCounters {
        checkmode_walks: CHECKMODE_WALK_COUNT.load(RELAXED),
        quickptr_hits: QUICKPTR_HIT_COUNT.load(RELAXED),
        insert_races: INSERT_RACE_COUNT.load(RELAXED),
        concurrency_aborts: CONCURRENCY_ABORT_COUNT.load(RELAXED),
        immediate_reclaims: IMMEDIATE_RECLAIM_COUNT.load(RELAXED),
        deferred_reclaims: DEFERRED_RECLAIM_COUNT.load(RELAXED),
    }
}

/// Zero every counter.
pub fn reset_debug_counters() {
    for counter in [
        &CHECKMODE_WALK_COUNT,
        &QUICKPTR_HIT_COUNT,
        &INSERT_RACE_COUNT,
        &CONCURRENCY_ABORT_COUNT,
        &IMMEDIATE_RECLAIM_COUNT,
        &DEFERRED_RECLAIM_COUNT,
    ] {
        counter.store(0, RELAXED);
    }
}

#[inline]
pub(crate) fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, RELAXED);
}
