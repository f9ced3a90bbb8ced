//! A single leaf: one named, typed, array-valued attribute.
//!
//! # Lock bundle
//!
//! | Lock | Protects | Taken by |
//! |------|----------|----------|
//! | `cell.values` (rwlock) | the element array | readers (read), updaters (upgradable -> write) |
//! | `link` (rwlock) | the `next` pointer | checkmode readers (pin), deleters (write) |
//! | `Arc` count | the allocation | whoever drops the last reference frees it |
//!
//! A proxy leaf shares `cell` with the leaf it aliases. Once shared, the cell
//! records every sharer, and a write through any of them is refused while
//! another live sharer is immutable.

use std::sync::atomic::{AtomicBool, AtomicU32};
use std::sync::{Arc, Weak};

use parking_lot::lock_api::ArcRwLockReadGuard;
use parking_lot::{Mutex, RawRwLock, RwLock, RwLockReadGuard, RwLockUpgradableReadGuard};

use crate::counters::{DEFERRED_RECLAIM_COUNT, IMMEDIATE_RECLAIM_COUNT, bump};
use crate::flags::LeafFlags;
use crate::key::{LeafKey, key_hash};
use crate::ordering::{READ_ORD, WRITE_ORD};
use crate::plant::PrivateData;
use crate::tracing_helpers::trace_log;
use crate::value::Values;

/// Successor pointer of a leaf.
pub(crate) type Link = Option<Arc<Leaf>>;

/// Element storage, shared between a leaf and its proxies.
pub(crate) struct ValueCell {
    values: RwLock<Values>,

    /// Leaves aliasing `values`. Empty until a proxy is attached.
    sharers: Mutex<Vec<Weak<Leaf>>>,
}

impl ValueCell {
    pub(crate) fn new(values: Values) -> Arc<Self> {
        Arc::new(Self {
            values: RwLock::new(values),
            sharers: Mutex::new(Vec::new()),
        })
    }

    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Values> {
        self.values.read()
    }

    #[inline]
    pub(crate) fn upgradable_read(&self) -> RwLockUpgradableReadGuard<'_, Values> {
        self.values.upgradable_read()
    }

    /// Record `leaf` as a sharer of these values.
    pub(crate) fn share(&self, leaf: &Arc<Leaf>) {
        let mut sharers = self.sharers.lock();
        sharers.retain(|weak| weak.strong_count() > 0);
        if !sharers.iter().any(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(leaf))) {
            sharers.push(Arc::downgrade(leaf));
        }
    }

    /// Whether some live, linked sharer is immutable.
    pub(crate) fn frozen_by_sharer(&self) -> bool {
        // Upgraded outside the lock so a dropped sharer never frees under it.
        let sharers: Vec<Arc<Leaf>> = self
            .sharers
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        sharers
            .iter()
            .any(|leaf| !leaf.is_deleting() && leaf.flags().is_immutable())
    }
}

pub(crate) struct Leaf {
    key: LeafKey,
    hash: u32,
    flags: AtomicU32,

    /// Set once the leaf is being unlinked; updaters abort when they see it.
    deleting: AtomicBool,

    pub(crate) cell: Arc<ValueCell>,
    pub(crate) link: Arc<RwLock<Link>>,
    pub(crate) private: Mutex<Option<PrivateData>>,
}

impl Leaf {
    /// Build a fully populated leaf. It becomes visible only once linked.
    pub(crate) fn new(key: &str, values: Values, flags: LeafFlags, next: Link) -> Self {
        Self::with_cell(key, ValueCell::new(values), flags, next)
    }

    /// Build a leaf around an existing value cell (proxy leaves).
    pub(crate) fn with_cell(
        key: &str,
        cell: Arc<ValueCell>,
        flags: LeafFlags,
        next: Link,
    ) -> Self {
        Self {
            key: LeafKey::new(key),
            hash: key_hash(key),
            flags: AtomicU32::new(flags.bits()),
            deleting: AtomicBool::new(false),
            cell,
            link: Arc::new(RwLock::new(next)),
            private: Mutex::new(None),
        }
    }

    #[inline]
    pub(crate) fn key(&self) -> &str {
        self.key.as_str()
    }

    #[inline]
    pub(crate) const fn hash(&self) -> u32 {
        self.hash
    }

    /// Hash first, then (unless skipped) the key bytes.
    #[inline]
    pub(crate) fn matches(&self, key: &str, hash: u32, skip_compare: bool) -> bool {
        self.hash == hash && (skip_compare || self.key() == key)
    }

    #[inline]
    pub(crate) fn flags(&self) -> LeafFlags {
        LeafFlags::from_bits(self.flags.load(READ_ORD))
    }

    #[inline]
    pub(crate) fn store_flags(&self, flags: LeafFlags) {
        self.flags.store(flags.bits(), WRITE_ORD);
    }

    #[inline]
    pub(crate) fn is_deleting(&self) -> bool {
        self.deleting.load(READ_ORD)
    }

    #[inline]
    pub(crate) fn mark_deleting(&self) {
        self.deleting.store(true, WRITE_ORD);
    }

    /// Current successor (short read lock on the link).
    #[inline]
    pub(crate) fn next(&self) -> Link {
        self.link.read().clone()
    }

    /// Approximate footprint in bytes, given the leaf's locked values.
    pub(crate) fn byte_size(&self, values: &Values) -> usize {
        size_of::<Self>() + self.key.heap_bytes() + values.byte_size()
    }

    /// Immutable itself, or sharing values with an immutable leaf.
    pub(crate) fn is_frozen(&self) -> bool {
        self.flags().is_immutable() || self.cell.frozen_by_sharer()
    }

    /// Drop a reference to an unlinked leaf, freeing it if this was the last.
    pub(crate) fn release(leaf: Arc<Self>) {
        match Arc::try_unwrap(leaf) {
            Ok(owned) => {
                trace_log!(key = owned.key(), "leaf freed by releasing thread");
                bump(&IMMEDIATE_RECLAIM_COUNT);
                drop(owned);
            }

            Err(shared) => {
                trace_log!(
                    key = shared.key(),
                    holders = Arc::strong_count(&shared) - 1,
                    "leaf still referenced, last holder frees it"
                );
                bump(&DEFERRED_RECLAIM_COUNT);
                drop(shared);
            }
        }
    }
}

impl std::fmt::Debug for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leaf")
            .field("key", &self.key)
            .field("hash", &self.hash)
            .field("flags", &self.flags())
            .field("deleting", &self.is_deleting())
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  ChainPin
// ============================================================================

/// A leaf pinned by a read lock on its link.
///
/// While the pin is held no deleter can rewrite this leaf's successor, so
/// the walker can safely step to it. Checkmode walks pin the next leaf before
/// dropping the current pin.
pub(crate) struct ChainPin {
    leaf: Arc<Leaf>,
    guard: ArcRwLockReadGuard<RawRwLock, Link>,
}

impl ChainPin {
    pub(crate) fn new(leaf: Arc<Leaf>) -> Self {
        let guard = leaf.link.read_arc();
        Self { leaf, guard }
    }

    #[inline]
    pub(crate) const fn leaf(&self) -> &Arc<Leaf> {
        &self.leaf
    }

    /// Successor as seen under the pin.
    #[inline]
    pub(crate) fn next(&self) -> Link {
        (*self.guard).clone()
    }
}
