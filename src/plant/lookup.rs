//! Key lookup.
//!
//! A reader first probes the plant's chain lock without blocking.
//!
//! - Probe succeeds: no deleter holds the chain. The reader registers in
//!   the reader count while still holding the probe, drops the probe, and
//!   walks the chain with plain link reads (normal mode). A deleter cannot
//!   rewrite any link until every registered reader has left.
//! - Probe fails and a deletion is in progress: the reader walks in
//!   checkmode. It pins each leaf's link with a read lock and pins the
//!   successor before releasing the current pin, so the deleter, which
//!   must write-lock the predecessor's link to unlink a leaf, can never
//!   pull a leaf out from under it.
//!
//! Either way the visitor runs while the walk's protection is still held,
//! so the leaf it sees cannot be freed underneath it.

use std::sync::Arc;

use crate::counters::{CHECKMODE_WALK_COUNT, QUICKPTR_HIT_COUNT, bump};
use crate::key::{TYPE_KEY, key_hash};
use crate::leaf::{ChainPin, Leaf, Link};
use crate::ordering::DELETE_FLAG_ORD;
use crate::value::Values;

use super::Plant;
use super::readers::ReaderRegistration;

/// Resolve the empty key to the `"type"` leaf.
#[inline]
pub(super) fn leaf_key(key: &str) -> &str {
    if key.is_empty() { TYPE_KEY } else { key }
}

enum ReadMode<'a> {
    Normal(ReaderRegistration<'a>),
    Check,
}

/// Outcome of a pass-1 lookup made on behalf of a writer.
pub(super) enum Probe {
    Found(Arc<Leaf>),

    /// Key absent. `boundary` is the first leaf after the head when the
    /// walk began; a second pass only has to rescan up to it.
    Absent { boundary: Link },

    Uprooted,
}

impl Plant {
    fn enter_reader(&self) -> ReadMode<'_> {
        let probe = if self.config.writer_preference() {
            self.chain_lock.try_read()
        } else {
            self.chain_lock.try_read_recursive()
        };

        match probe {
            Some(chain) => {
                let registration = self.readers.register();
                drop(chain);
                ReadMode::Normal(registration)
            }

            None if self.delete_in_progress.load(DELETE_FLAG_ORD) => ReadMode::Check,

            None => {
                let chain = self.chain_lock.read();
                let registration = self.readers.register();
                drop(chain);
                ReadMode::Normal(registration)
            }
        }
    }

    /// Find `key` and hand the leaf (or `None`) plus the walk's boundary to
    /// `visit` while the leaf is still protected.
    pub(super) fn locate<R>(
        &self,
        key: &str,
        visit: impl FnOnce(Option<&Arc<Leaf>>, &Link) -> R,
    ) -> R {
        let key = leaf_key(key);
        let hash = key_hash(key);
        let skip = self.config.skip_key_compare();

        if self.is_uprooted() {
            return visit(None, &None);
        }

        match self.enter_reader() {
            ReadMode::Normal(_registration) => {
                let boundary = self.head.next();

                if let Some(hint) = self.quick_hint(key, hash) {
                    return visit(Some(&hint), &boundary);
                }

                let mut cursor = Some(Arc::clone(&self.head));
                while let Some(leaf) = cursor {
                    if leaf.matches(key, hash, skip) && !leaf.is_deleting() {
                        self.remember(&leaf);
                        return visit(Some(&leaf), &boundary);
                    }
                    cursor = leaf.next();
                }
                visit(None, &boundary)
            }

            ReadMode::Check => {
                bump(&CHECKMODE_WALK_COUNT);

                let mut pin = ChainPin::new(Arc::clone(&self.head));
                let boundary = pin.next();
                loop {
                    let leaf = pin.leaf();
                    if leaf.matches(key, hash, skip) && !leaf.is_deleting() {
                        return visit(Some(leaf), &boundary);
                    }
                    let Some(next) = pin.next() else {
                        return visit(None, &boundary);
                    };
                    // The successor is pinned before the old pin is released.
                    pin = ChainPin::new(next);
                }
            }
        }
    }

    /// Run `f` on leaf `key` and its values under the value read-lock.
    pub(super) fn read_leaf<R>(
        &self,
        key: &str,
        f: impl FnOnce(&Arc<Leaf>, &Values) -> R,
    ) -> Option<R> {
        self.locate(key, |found, _| {
            found.map(|leaf| {
                let values = leaf.cell.read();
                f(leaf, &values)
            })
        })
    }

    /// Pass 1 of a mutation.
    pub(super) fn probe(&self, key: &str) -> Probe {
        if self.is_uprooted() {
            return Probe::Uprooted;
        }
        self.locate(key, |found, boundary| match found {
            Some(leaf) => Probe::Found(Arc::clone(leaf)),
            None => Probe::Absent {
                boundary: boundary.clone(),
            },
        })
    }

    // ========================================================================
    //  Quick pointer
    // ========================================================================

    /// Consult the hint. Only valid in normal mode.
    fn quick_hint(&self, key: &str, hash: u32) -> Option<Arc<Leaf>> {
        let hint = self.quick.try_lock()?.upgrade()?;
        if hint.matches(key, hash, self.config.skip_key_compare()) && !hint.is_deleting() {
            bump(&QUICKPTR_HIT_COUNT);
            Some(hint)
        } else {
            None
        }
    }

    fn remember(&self, leaf: &Arc<Leaf>) {
        if let Some(mut slot) = self.quick.try_lock() {
            *slot = Arc::downgrade(leaf);
        }
    }

    /// Drop the hint if it names `victim`. Called with readers drained.
    pub(super) fn forget(&self, victim: &Arc<Leaf>) {
        let mut slot = self.quick.lock();
        if std::ptr::eq(slot.as_ptr(), Arc::as_ptr(victim)) {
            *slot = std::sync::Weak::new();
        }
    }
}
