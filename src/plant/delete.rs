//! Leaf deletion and whole-plant free.
//!
//! # Protocol
//!
//! 1. Serialize with other deleters (`structure`).
//! 2. Raise `delete_in_progress`, then take the chain lock for writing. From
//!    here on new readers walk in checkmode and inserters wait.
//! 3. Find the victim and its predecessor; check deletability.
//! 4. Wait for normal-mode readers to drain, then drop the quick pointer.
//! 5. Mark the victim deleting so in-flight updaters abort.
//! 6. Rewrite the predecessor's link under its write lock. This waits for
//!    any checkmode reader pinned on the predecessor.
//! 7. Release the deleter's reference; whoever holds the last one frees it.

use std::sync::Arc;

use crate::error::{WeedError, WeedResult};
use crate::key::{TYPE_KEY, key_hash};
use crate::leaf::Leaf;
use crate::ordering::WRITE_ORD;
use crate::tracing_helpers::{debug_log, trace_log, warn_log};

use super::lookup::leaf_key;
use super::{FlagGuard, Plant};

impl Plant {
    /// Unlink and release leaf `key`.
    ///
    /// # Errors
    /// - [`WeedError::Undeletable`] for the `"type"` leaf, the empty key, or a
    ///   leaf flagged undeletable.
    /// - [`WeedError::NoSuchLeaf`] if the key is absent.
    pub fn delete(&self, key: &str) -> WeedResult<()> {
        if key.is_empty() || key == TYPE_KEY {
            return Err(WeedError::Undeletable);
        }

        let victim = {
            let _serial = self.structure.lock();
            let _flag = FlagGuard::raise(&self.delete_in_progress);
            let _chain = self.chain_lock.write();

            if self.is_uprooted() {
                return Err(WeedError::NoSuchLeaf);
            }

            let (prev, victim) = self
                .find_with_predecessor(key)
                .ok_or(WeedError::NoSuchLeaf)?;
            if victim.flags().is_undeletable() {
                return Err(WeedError::Undeletable);
            }

            self.readers.wait_for_drain();
            self.forget(&victim);
            victim.mark_deleting();

            #[cfg(test)]
            self.hooks.call_before_unlink();

            let successor = victim.next();
            *prev.link.write() = successor;
            trace_log!(key, "leaf unlinked");
            victim
        };

        Leaf::release(victim);
        Ok(())
    }

    /// Locate `key` after the head, along with the leaf before it.
    ///
    /// Caller holds the chain lock for writing.
    fn find_with_predecessor(&self, key: &str) -> Option<(Arc<Leaf>, Arc<Leaf>)> {
        let key = leaf_key(key);
        let hash = key_hash(key);
        let skip = self.config.skip_key_compare();

        let mut prev = Arc::clone(&self.head);
        let mut cursor = prev.next();
        while let Some(leaf) = cursor {
            if leaf.matches(key, hash, skip) {
                return Some((prev, leaf));
            }
            cursor = leaf.next();
            prev = leaf;
        }
        None
    }

    /// Release every leaf, leaving an uprooted plant that answers
    /// not-found for every key.
    ///
    /// All or nothing: if any leaf (the `"type"` leaf included) is flagged
    /// undeletable, nothing is released. Freeing an already uprooted plant
    /// succeeds.
    ///
    /// # Errors
    /// [`WeedError::Undeletable`] if some leaf is undeletable.
    pub fn free(&self) -> WeedResult<()> {
        let leaves = {
            let _serial = self.structure.lock();
            let _flag = FlagGuard::raise(&self.delete_in_progress);
            let _chain = self.chain_lock.write();

            if self.is_uprooted() {
                return Ok(());
            }

            let mut leaves = Vec::new();
            let mut cursor = self.head.next();
            while let Some(leaf) = cursor {
                cursor = leaf.next();
                leaves.push(leaf);
            }

            let blocked = std::iter::once(&self.head)
                .chain(leaves.iter())
                .find(|leaf| leaf.flags().is_undeletable());
            if let Some(leaf) = blocked {
                warn_log!(key = leaf.key(), "plant free refused, leaf is undeletable");
                return Err(WeedError::Undeletable);
            }

            self.readers.wait_for_drain();
            *self.quick.lock() = std::sync::Weak::new();
            for leaf in &leaves {
                leaf.mark_deleting();
            }
            self.uprooted.store(true, WRITE_ORD);
            *self.head.link.write() = None;
            leaves
        };

        debug_log!(leaves = leaves.len(), "plant freed");
        // Front to back: each leaf's successor is still held by the vector,
        // so no release recurses down the chain.
        for leaf in leaves {
            Leaf::release(leaf);
        }
        Ok(())
    }
}
