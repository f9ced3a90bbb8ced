//! Two-pass set/append.
//!
//! Pass 1 is an ordinary lookup. If the key exists the leaf is updated in
//! place. Otherwise pass 2 takes the chain lock shared (excluding deleters)
//! and the reference lock exclusive (excluding other inserters), rescans
//! only the leaves linked since pass 1 began, and either finds a racing
//! insert of the same key (and updates it) or links a fully built leaf
//! directly after the head.

use std::sync::Arc;

use parking_lot::RwLockUpgradableReadGuard;

use crate::counters::{CONCURRENCY_ABORT_COUNT, INSERT_RACE_COUNT, bump};
use crate::error::{WeedError, WeedResult};
use crate::flags::LeafFlags;
use crate::key::key_hash;
use crate::leaf::{Leaf, Link, ValueCell};
use crate::tracing_helpers::{debug_log, trace_log};
use crate::value::Values;

use super::Plant;
use super::lookup::{Probe, leaf_key};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum StoreMode {
    Replace,
    Append,
}

/// Content of a leaf about to be linked.
pub(super) enum LeafBody {
    Values(Values),

    /// Shares another leaf's value cell.
    Alias(Arc<ValueCell>),
}

pub(super) enum Linked {
    Inserted,

    /// A racing thread linked the key first; the body is handed back.
    Existing(Arc<Leaf>, LeafBody),
}

impl Plant {
    /// Create or replace leaf `key`.
    ///
    /// # Errors
    /// - [`WeedError::WrongSeedType`] if the leaf exists with another seed.
    /// - [`WeedError::Immutable`] if the leaf is immutable.
    /// - [`WeedError::NoSuchElement`] for the `"type"` leaf unless exactly one element is given.
    /// - [`WeedError::Concurrency`] if the leaf was deleted mid-update.
    /// - [`WeedError::NoSuchLeaf`] if the plant has been freed.
    pub fn set(&self, key: &str, values: Values) -> WeedResult<()> {
        self.store(key, values, StoreMode::Replace)
    }

    /// Append to leaf `key`, creating it if absent.
    ///
    /// # Errors
    /// As [`Plant::set`], plus [`WeedError::MemoryAllocation`] if the
    /// combined array cannot be allocated (the leaf is left unchanged).
    pub fn append(&self, key: &str, values: Values) -> WeedResult<()> {
        self.store(key, values, StoreMode::Append)
    }

    fn store(&self, key: &str, values: Values, mode: StoreMode) -> WeedResult<()> {
        let key = leaf_key(key);

        let boundary = match self.probe(key) {
            Probe::Found(leaf) => return self.update(leaf, values, mode),
            Probe::Absent { boundary } => boundary,
            Probe::Uprooted => return Err(WeedError::NoSuchLeaf),
        };

        #[cfg(test)]
        self.hooks.call_between_passes();

        match self.link_new(key, LeafBody::Values(values), &boundary)? {
            Linked::Inserted => Ok(()),
            Linked::Existing(leaf, LeafBody::Values(values)) => self.update(leaf, values, mode),
            Linked::Existing(_, LeafBody::Alias(_)) => Err(WeedError::Concurrency),
        }
    }

    /// Pass 2: rescan the new prefix of the chain, then link.
    pub(super) fn link_new(
        &self,
        key: &str,
        body: LeafBody,
        boundary: &Link,
    ) -> WeedResult<Linked> {
        let _chain = self.chain_lock.read();
        let _inserts = self.reference_lock.write();

        if self.is_uprooted() {
            return Err(WeedError::NoSuchLeaf);
        }

        let hash = key_hash(key);
        if let Some(existing) = self.rescan(key, hash, boundary.as_ref()) {
            bump(&INSERT_RACE_COUNT);
            debug_log!(key, "insert lost the race, updating existing leaf");
            return Ok(Linked::Existing(existing, body));
        }

        let mut first = self.head.link.write();
        let next = first.take();
        let leaf = match body {
            LeafBody::Values(values) => Arc::new(Leaf::new(key, values, LeafFlags::empty(), next)),
            LeafBody::Alias(cell) => {
                let proxy = Arc::new(Leaf::with_cell(key, cell, LeafFlags::PROXY, next));
                proxy.cell.share(&proxy);
                proxy
            }
        };
        *first = Some(leaf);
        trace_log!(key, "leaf linked");
        Ok(Linked::Inserted)
    }

    /// Walk from the head up to (not including) `boundary`.
    fn rescan(&self, key: &str, hash: u32, boundary: Option<&Arc<Leaf>>) -> Option<Arc<Leaf>> {
        let skip = self.config.skip_key_compare();
        let mut cursor = self.head.next();
        while let Some(leaf) = cursor {
            if boundary.is_some_and(|b| Arc::ptr_eq(b, &leaf)) {
                return None;
            }
            if leaf.matches(key, hash, skip) {
                return Some(leaf);
            }
            cursor = leaf.next();
        }
        None
    }

    fn update(&self, leaf: Arc<Leaf>, values: Values, mode: StoreMode) -> WeedResult<()> {
        if self.is_head(&leaf) && (mode == StoreMode::Append || values.len() != 1) {
            return Err(WeedError::NoSuchElement);
        }

        Self::write_leaf(leaf, |current| {
            if current.seed_type() != values.seed_type() {
                return Err(WeedError::WrongSeedType);
            }
            match mode {
                StoreMode::Replace => {
                    *current = values;
                    Ok(())
                }
                StoreMode::Append => current.append(values),
            }
        })
    }

    /// Shared in-place write path.
    ///
    /// Takes the value lock upgradable so readers keep going while the
    /// policy checks run, then upgrades. A leaf that turns out to be
    /// mid-deletion is released and the write aborts with
    /// [`WeedError::Concurrency`].
    pub(super) fn write_leaf<R>(
        leaf: Arc<Leaf>,
        f: impl FnOnce(&mut Values) -> WeedResult<R>,
    ) -> WeedResult<R> {
        let cell = Arc::clone(&leaf.cell);

        let values = cell.upgradable_read();
        if leaf.is_deleting() {
            drop(values);
            return Self::abort_write(leaf);
        }
        if leaf.is_frozen() {
            return Err(WeedError::Immutable);
        }

        let mut values = RwLockUpgradableReadGuard::upgrade(values);
        if leaf.is_deleting() {
            drop(values);
            return Self::abort_write(leaf);
        }
        f(&mut values)
    }

    fn abort_write<R>(leaf: Arc<Leaf>) -> WeedResult<R> {
        bump(&CONCURRENCY_ABORT_COUNT);
        debug_log!(key = leaf.key(), "write aborted, leaf is being deleted");
        Leaf::release(leaf);
        Err(WeedError::Concurrency)
    }
}
