//! `Plant` - a thread-safe bag of named, typed, array-valued leaves.
//!
//! A plant is a singly linked chain of leaves. The first leaf is always the
//! immutable `"type"` leaf; new leaves are linked directly after it.
//!
//! # Lock bundle
//!
//! | Lock | Held by |
//! |------|---------|
//! | `chain_lock` write | deleters and [`Plant::free`] for their whole critical section |
//! | `chain_lock` read | inserters during pass 2, reader probes (briefly) |
//! | `reference_lock` write | inserters during pass 2 (one inserter at a time) |
//! | `reference_lock` read | [`Plant::list_leaves`] |
//! | `structure` | serializes deleters |
//! | `readers` | counts normal-mode readers; deleters wait for zero |
//!
//! Readers never block on a deleter: when the chain probe fails while a
//! deletion is in progress they walk in checkmode, pinning each leaf's link
//! hand over hand (see [`lookup`]).

use std::any::Any;
use std::fmt as StdFmt;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::bootstrap::Config;
use crate::error::{WeedError, WeedResult};
use crate::flags::LeafFlags;
use crate::key::TYPE_KEY;
use crate::leaf::Leaf;
use crate::ordering::{DELETE_FLAG_ORD, READ_ORD};
use crate::seed::SeedType;
use crate::tracing_helpers::trace_log;
use crate::value::{Value, Values};

mod delete;
mod extended;
mod lookup;
mod mutate;
mod readers;

#[cfg(test)]
pub mod test_hooks;

#[cfg(test)]
mod shuttle_tests;

#[cfg(all(test, loom))]
mod loom_tests;

use readers::ReaderCount;

/// Opaque host data attached to a leaf. Never interpreted by the store.
pub type PrivateData = Arc<dyn Any + Send + Sync>;

// ============================================================================
//  Plant
// ============================================================================

/// A chain of leaves shared between threads. Created by
/// [`Weed::plant_new`](crate::Weed::plant_new).
pub struct Plant {
    /// The `"type"` leaf; never unlinked.
    head: Arc<Leaf>,

    config: Config,

    chain_lock: RwLock<()>,
    reference_lock: RwLock<()>,
    structure: Mutex<()>,
    readers: ReaderCount,

    /// Raised by a deleter before it takes `chain_lock` for writing.
    delete_in_progress: AtomicBool,

    /// Set once [`Plant::free`] has unlinked every leaf.
    uprooted: AtomicBool,

    /// Last leaf found by a normal-mode lookup. Hint only.
    quick: Mutex<Weak<Leaf>>,

    #[cfg(test)]
    hooks: test_hooks::Hooks,
}

impl Plant {
    /// Create a plant whose `"type"` leaf holds `plant_type`.
    #[must_use]
    pub(crate) fn new(config: Config, plant_type: i32) -> Arc<Self> {
        let head = Leaf::new(
            TYPE_KEY,
            Values::Int(vec![plant_type]),
            LeafFlags::IMMUTABLE,
            None,
        );

        Arc::new(Self {
            head: Arc::new(head),
            config,
            chain_lock: RwLock::new(()),
            reference_lock: RwLock::new(()),
            structure: Mutex::new(()),
            readers: ReaderCount::default(),
            delete_in_progress: AtomicBool::new(false),
            uprooted: AtomicBool::new(false),
            quick: Mutex::new(Weak::new()),
            #[cfg(test)]
            hooks: test_hooks::Hooks::default(),
        })
    }

    /// Configuration negotiated by the [`Weed`](crate::Weed) that created this plant.
    #[must_use]
    pub const fn config(&self) -> Config {
        self.config
    }

    /// Whether [`Plant::free`] has run.
    #[must_use]
    pub fn is_uprooted(&self) -> bool {
        self.uprooted.load(READ_ORD)
    }

    #[cfg(test)]
    pub(crate) const fn hooks(&self) -> &test_hooks::Hooks {
        &self.hooks
    }

    fn is_head(&self, leaf: &Arc<Leaf>) -> bool {
        Arc::ptr_eq(leaf, &self.head)
    }

    // ========================================================================
    //  Reads
    // ========================================================================

    /// Element `idx` of leaf `key`. An empty key names the `"type"` leaf.
    ///
    /// # Errors
    /// - [`WeedError::NoSuchLeaf`] if the key is absent.
    /// - [`WeedError::NoSuchElement`] if `idx` is out of range.
    pub fn get(&self, key: &str, idx: usize) -> WeedResult<Value> {
        self.with_values(key, |values| values.get(idx).ok_or(WeedError::NoSuchElement))
    }

    /// Snapshot of every element of leaf `key`.
    ///
    /// # Errors
    /// [`WeedError::NoSuchLeaf`] if the key is absent.
    pub fn get_all(&self, key: &str) -> WeedResult<Values> {
        self.with_values(key, |values| Ok(values.clone()))
    }

    /// Element `idx` in its ABI byte encoding.
    ///
    /// # Errors
    /// Same as [`Plant::get`].
    pub fn get_bytes(&self, key: &str, idx: usize) -> WeedResult<Vec<u8>> {
        let encoding = self.config.encoding();
        self.with_values(key, |values| {
            values
                .encode(idx, encoding)
                .ok_or(WeedError::NoSuchElement)
        })
    }

    /// Number of elements; 0 for absent keys.
    #[must_use]
    pub fn num_elements(&self, key: &str) -> usize {
        self.with_values(key, |values| Ok(values.len()))
            .unwrap_or(0)
    }

    /// Encoded byte size of element `idx`; 0 for absent keys or elements.
    #[must_use]
    pub fn element_size(&self, key: &str, idx: usize) -> usize {
        let encoding = self.config.encoding();
        self.with_values(key, |values| {
            values
                .element_size(idx, encoding)
                .ok_or(WeedError::NoSuchElement)
        })
        .unwrap_or(0)
    }

    /// Seed type of leaf `key`, or `None` if absent.
    #[must_use]
    pub fn seed_type(&self, key: &str) -> Option<SeedType> {
        self.with_values(key, |values| Ok(values.seed_type())).ok()
    }

    /// Flags of leaf `key`; empty for absent keys.
    #[must_use]
    pub fn flags(&self, key: &str) -> LeafFlags {
        self.read_leaf(key, |leaf, _| leaf.flags())
            .unwrap_or_default()
    }

    pub(crate) fn with_values<R>(
        &self,
        key: &str,
        f: impl FnOnce(&Values) -> WeedResult<R>,
    ) -> WeedResult<R> {
        self.read_leaf(key, |_, values| f(values))
            .ok_or(WeedError::NoSuchLeaf)?
    }

    // ========================================================================
    //  Host-only operations
    // ========================================================================

    /// Replace the flags of leaf `key`.
    ///
    /// The `"type"` leaf always keeps [`LeafFlags::IMMUTABLE`]; the proxy
    /// bit is owned by the store and cannot be changed here.
    ///
    /// # Errors
    /// [`WeedError::NoSuchLeaf`] if the key is absent.
    pub fn set_flags(&self, key: &str, flags: LeafFlags) -> WeedResult<()> {
        self.read_leaf(key, |leaf, _| {
            let proxy = leaf.flags() & LeafFlags::PROXY;
            let mut next = flags.without(LeafFlags::PROXY) | proxy;
            if self.is_head(leaf) {
                next = next | LeafFlags::IMMUTABLE;
            }
            leaf.store_flags(next);
        })
        .ok_or(WeedError::NoSuchLeaf)
    }

    /// Attach opaque host data to leaf `key`, replacing any previous data.
    ///
    /// # Errors
    /// [`WeedError::NoSuchLeaf`] if the key is absent.
    pub fn set_private_data(&self, key: &str, data: Option<PrivateData>) -> WeedResult<()> {
        self.read_leaf(key, |leaf, _| *leaf.private.lock() = data)
            .ok_or(WeedError::NoSuchLeaf)
    }

    /// Host data attached to leaf `key`.
    ///
    /// # Errors
    /// [`WeedError::NoSuchLeaf`] if the key is absent.
    pub fn private_data(&self, key: &str) -> WeedResult<Option<PrivateData>> {
        self.read_leaf(key, |leaf, _| leaf.private.lock().clone())
            .ok_or(WeedError::NoSuchLeaf)
    }

    // ========================================================================
    //  Introspection
    // ========================================================================

    /// Every key in chain order, `"type"` first.
    ///
    /// Blocks inserters and deleters for the duration of the walk.
    #[must_use]
    pub fn list_leaves(&self) -> Vec<String> {
        let _chain = self.chain_lock.read();
        let _inserts = self.reference_lock.read();

        if self.is_uprooted() {
            return Vec::new();
        }

        let mut keys = Vec::new();
        let mut cursor = Some(Arc::clone(&self.head));
        while let Some(leaf) = cursor {
            keys.push(leaf.key().to_owned());
            cursor = leaf.next();
        }
        keys
    }

    /// Approximate footprint of leaf `key` in bytes; 0 if absent.
    #[must_use]
    pub fn leaf_byte_size(&self, key: &str) -> usize {
        self.read_leaf(key, |leaf, values| leaf.byte_size(values))
            .unwrap_or(0)
    }

    /// Approximate footprint of the whole plant in bytes.
    #[must_use]
    pub fn plant_byte_size(&self) -> usize {
        let _chain = self.chain_lock.read();
        let _inserts = self.reference_lock.read();

        let mut total = size_of::<Self>();
        let mut cursor = Some(Arc::clone(&self.head));
        while let Some(leaf) = cursor {
            total += leaf.byte_size(&leaf.cell.read());
            cursor = leaf.next();
        }
        total
    }
}

impl Drop for Plant {
    fn drop(&mut self) {
        // Unlink iteratively; a recursive drop of a long chain would
        // overflow the stack.
        let mut cursor = self.head.link.write().take();
        while let Some(leaf) = cursor {
            cursor = leaf.link.write().take();
        }
        trace_log!("plant dropped");
    }
}

impl StdFmt::Debug for Plant {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Plant")
            .field("config", &self.config)
            .field("uprooted", &self.is_uprooted())
            .field("delete_in_progress", &self.delete_in_progress.load(READ_ORD))
            .finish_non_exhaustive()
    }
}

/// Mark `flag` for the lifetime of the guard.
pub(crate) struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    pub(crate) fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, DELETE_FLAG_ORD);
        Self(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, DELETE_FLAG_ORD);
    }
}

// ============================================================================
//  Tests
// ============================================================================
