//! Function tables published to plugins and to the host.
//!
//! Plugins see [`PluginFuncs`] only; which entries are filled depends on the
//! negotiated ABI. The host additionally gets flag and private-data
//! mutation, size introspection, and (when it opted in at init) the
//! [`ExtFuncs`] subset.
//!
//! ```
//! use weed::{InitFlags, Values, WEED_ABI_VERSION, Weed};
//!
//! let weed = Weed::init(WEED_ABI_VERSION, InitFlags::empty()).unwrap();
//! let funcs = weed.plugin_funcs();
//!
//! let plant = (funcs.plant_new)(funcs.config, 3);
//! (funcs.leaf_set)(&plant, "gain", Values::from(vec![0.5])).unwrap();
//! if let Some(append) = funcs.leaf_append {
//!     append(&plant, "gain", Values::from(vec![0.75])).unwrap();
//! }
//! assert_eq!((funcs.leaf_num_elements)(&plant, "gain"), 2);
//! ```

use std::sync::Arc;

use crate::bootstrap::{ABI_APPEND, Config};
use crate::error::WeedResult;
use crate::flags::LeafFlags;
use crate::plant::{Plant, PrivateData};
use crate::seed::SeedType;
use crate::value::{Value, Values};

/// New plant of the given type under the table's configuration.
pub type PlantNewFn = fn(Config, i32) -> Arc<Plant>;
/// All-or-nothing release of every leaf.
pub type PlantFreeFn = fn(&Plant) -> WeedResult<()>;
/// Every key, `"type"` first.
pub type PlantListLeavesFn = fn(&Plant) -> Vec<String>;
/// Create or replace (or, for append, extend) a leaf.
pub type LeafSetFn = fn(&Plant, &str, Values) -> WeedResult<()>;
/// Copy out one element.
pub type LeafGetFn = fn(&Plant, &str, usize) -> WeedResult<Value>;
/// Copy out every element.
pub type LeafGetAllFn = fn(&Plant, &str) -> WeedResult<Values>;
/// Unlink and release a leaf.
pub type LeafDeleteFn = fn(&Plant, &str) -> WeedResult<()>;
/// Element count; 0 when absent.
pub type LeafNumElementsFn = fn(&Plant, &str) -> usize;
/// Encoded size of one element; 0 when absent.
pub type LeafElementSizeFn = fn(&Plant, &str, usize) -> usize;
/// Seed type, or `None` when absent.
pub type LeafSeedTypeFn = fn(&Plant, &str) -> Option<SeedType>;
/// Leaf flags; empty when absent.
pub type LeafGetFlagsFn = fn(&Plant, &str) -> LeafFlags;

// ============================================================================
//  PluginFuncs
// ============================================================================

/// Operations available to plugins.
#[derive(Clone, Copy, Debug)]
pub struct PluginFuncs {
    /// Configuration to pass to [`PluginFuncs::plant_new`].
    pub config: Config,

    /// [`Plant`] construction; pass [`PluginFuncs::config`].
    pub plant_new: PlantNewFn,
    /// [`Plant::free`].
    pub plant_free: PlantFreeFn,
    /// [`Plant::list_leaves`].
    pub plant_list_leaves: PlantListLeavesFn,
    /// [`Plant::set`].
    pub leaf_set: LeafSetFn,
    /// [`Plant::get`].
    pub leaf_get: LeafGetFn,
    /// [`Plant::delete`].
    pub leaf_delete: LeafDeleteFn,
    /// [`Plant::num_elements`].
    pub leaf_num_elements: LeafNumElementsFn,
    /// [`Plant::element_size`].
    pub leaf_element_size: LeafElementSizeFn,
    /// [`Plant::seed_type`].
    pub leaf_seed_type: LeafSeedTypeFn,
    /// [`Plant::flags`].
    pub leaf_get_flags: LeafGetFlagsFn,

    /// Published from ABI 201.
    pub leaf_append: Option<LeafSetFn>,
    /// Published from ABI 201.
    pub leaf_get_all: Option<LeafGetAllFn>,
}

impl PluginFuncs {
    pub(crate) fn for_config(config: Config) -> Self {
        let has_append = config.abi_version() >= ABI_APPEND;
        Self {
            config,
            plant_new: Plant::new,
            plant_free: Plant::free,
            plant_list_leaves: Plant::list_leaves,
            leaf_set: Plant::set,
            leaf_get: Plant::get,
            leaf_delete: Plant::delete,
            leaf_num_elements: Plant::num_elements,
            leaf_element_size: Plant::element_size,
            leaf_seed_type: Plant::seed_type,
            leaf_get_flags: Plant::flags,
            leaf_append: has_append.then_some(Plant::append as LeafSetFn),
            leaf_get_all: has_append.then_some(Plant::get_all as LeafGetAllFn),
        }
    }
}

// ============================================================================
//  HostFuncs
// ============================================================================

/// Operations reserved for the host.
///
/// `plugin` is the host's own copy of the plugin table; the host always
/// gets append and get-all regardless of ABI.
#[derive(Clone, Copy, Debug)]
pub struct HostFuncs {
    /// Plugin table with append and get-all always filled.
    pub plugin: PluginFuncs,

    /// [`Plant::set_flags`].
    pub leaf_set_flags: fn(&Plant, &str, LeafFlags) -> WeedResult<()>,
    /// [`Plant::set_private_data`].
    pub leaf_set_private_data: fn(&Plant, &str, Option<PrivateData>) -> WeedResult<()>,
    /// [`Plant::private_data`].
    pub leaf_get_private_data: fn(&Plant, &str) -> WeedResult<Option<PrivateData>>,
    /// [`Plant::leaf_byte_size`].
    pub leaf_byte_size: fn(&Plant, &str) -> usize,
    /// [`Plant::plant_byte_size`].
    pub plant_byte_size: fn(&Plant) -> usize,

    /// Present only when init asked for extended functions.
    pub ext: Option<ExtFuncs>,
}

impl HostFuncs {
    pub(crate) fn for_config(config: Config) -> Self {
        let mut plugin = PluginFuncs::for_config(config);
        plugin.leaf_append = Some(Plant::append as LeafSetFn);
        plugin.leaf_get_all = Some(Plant::get_all as LeafGetAllFn);

        Self {
            plugin,
            leaf_set_flags: Plant::set_flags,
            leaf_set_private_data: Plant::set_private_data,
            leaf_get_private_data: Plant::private_data,
            leaf_byte_size: Plant::leaf_byte_size,
            plant_byte_size: Plant::plant_byte_size,
            ext: config.extended_functions().then_some(ExtFuncs::TABLE),
        }
    }
}

// ============================================================================
//  ExtFuncs
// ============================================================================

/// Extended host operations.
#[derive(Clone, Copy, Debug)]
pub struct ExtFuncs {
    /// Force a string element to an exact byte size (truncate or NUL-pad).
    pub set_element_size: fn(&Plant, &str, usize, usize) -> WeedResult<()>,

    /// Reinterpret a leaf under a compatible seed type.
    pub recast_seed_type: fn(&Plant, &str, SeedType) -> WeedResult<()>,

    /// Replace the values of an existing leaf, returning the previous ones.
    pub atomic_exchange: fn(&Plant, &str, Values) -> WeedResult<Values>,

    /// `attach_leaf(dst, dst_key, src, src_key)`: make `dst_key` share the
    /// value array of `src_key`.
    pub attach_leaf: fn(&Plant, &str, &Plant, &str) -> WeedResult<()>,
}

impl ExtFuncs {
    const TABLE: Self = Self {
        set_element_size: Plant::ext_set_element_size,
        recast_seed_type: Plant::ext_recast_seed_type,
        atomic_exchange: Plant::ext_atomic_exchange,
        attach_leaf: Plant::ext_attach_leaf,
    };
}
