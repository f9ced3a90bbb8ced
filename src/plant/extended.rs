//! Host-only extended operations.
//!
//! Reachable through [`crate::api::ExtFuncs`], which is only published when
//! the host asked for [`crate::InitFlags::EXTENDED_FUNCTIONS`].

use std::mem;
use std::sync::Arc;

use crate::error::{WeedError, WeedResult};
use crate::key::TYPE_KEY;
use crate::leaf::Leaf;
use crate::seed::SeedType;
use crate::tracing_helpers::debug_log;
use crate::value::Values;

use super::Plant;
use super::lookup::{Probe, leaf_key};
use super::mutate::{LeafBody, Linked};

impl Plant {
    fn existing_leaf(&self, key: &str) -> WeedResult<Arc<Leaf>> {
        match self.probe(key) {
            Probe::Found(leaf) => Ok(leaf),
            Probe::Absent { .. } | Probe::Uprooted => Err(WeedError::NoSuchLeaf),
        }
    }

    /// Force element `idx` of string leaf `key` to `size` bytes.
    pub(crate) fn ext_set_element_size(
        &self,
        key: &str,
        idx: usize,
        size: usize,
    ) -> WeedResult<()> {
        let leaf = self.existing_leaf(key)?;
        Self::write_leaf(leaf, |values| values.resize_element(idx, size))
    }

    /// Reinterpret leaf `key` under a compatible seed.
    pub(crate) fn ext_recast_seed_type(&self, key: &str, seed: SeedType) -> WeedResult<()> {
        let leaf = self.existing_leaf(key)?;
        Self::write_leaf(leaf, |values| values.recast(seed))
    }

    /// Swap the values of an existing leaf, returning the old ones.
    pub(crate) fn ext_atomic_exchange(&self, key: &str, values: Values) -> WeedResult<Values> {
        let leaf = self.existing_leaf(key)?;
        if self.is_head(&leaf) && values.len() != 1 {
            return Err(WeedError::NoSuchElement);
        }
        Self::write_leaf(leaf, |current| {
            if current.seed_type() != values.seed_type() {
                return Err(WeedError::WrongSeedType);
            }
            Ok(mem::replace(current, values))
        })
    }

    /// Make `key` a proxy for `src_key` of `src`: both names then share one
    /// value array. An existing deletable `key` is replaced.
    ///
    /// Writes through any name sharing the array fail with
    /// [`WeedError::Immutable`] while one of them is immutable. A plant's
    /// `"type"` leaf cannot be aliased. Deleting either leaf later leaves
    /// the other intact.
    pub(crate) fn ext_attach_leaf(&self, key: &str, src: &Self, src_key: &str) -> WeedResult<()> {
        let key = leaf_key(key);
        if key == TYPE_KEY {
            return Err(WeedError::Immutable);
        }

        let origin = src.existing_leaf(src_key)?;
        if src.is_head(&origin) {
            return Err(WeedError::Immutable);
        }
        origin.cell.share(&origin);
        let cell = Arc::clone(&origin.cell);

        let boundary = match self.probe(key) {
            Probe::Found(_) => {
                self.delete(key)?;
                match self.probe(key) {
                    Probe::Absent { boundary } => boundary,
                    Probe::Found(_) => return Err(WeedError::Concurrency),
                    Probe::Uprooted => return Err(WeedError::NoSuchLeaf),
                }
            }
            Probe::Absent { boundary } => boundary,
            Probe::Uprooted => return Err(WeedError::NoSuchLeaf),
        };

        match self.link_new(key, LeafBody::Alias(cell), &boundary)? {
            Linked::Inserted => {
                debug_log!(key, src_key, "proxy leaf attached");
                Ok(())
            }
            Linked::Existing(..) => Err(WeedError::Concurrency),
        }
    }
}
