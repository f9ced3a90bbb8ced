//! # `weed`
//!
//! A thread-safe, dynamically typed attribute store for passing structured
//! data between a host application and its plugins.
//!
//! Data lives in **plants**. A plant is a chain of named, typed, array-valued
//! **leaves**, headed by a protected `"type"` leaf that records the plant type.
//! Every leaf holds N elements of a single **seed type** (int, double,
//! boolean, string, int64, pointer seeds, or host-defined custom seeds).
//!
//! ## Thread Safety
//!
//! `Plant` is `Send + Sync`. Any number of threads may read, set, append to
//! and delete leaves of the same plant concurrently:
//!
//! - Reads never observe a half-written value (per-leaf value locks).
//! - Racing inserts of a brand-new key produce exactly one leaf.
//! - Once `delete` returns, the key is gone for every later lookup.
//! - Leaves are reclaimed by whichever thread drops the last reference.
//!
//! ```rust
//! use weed::{InitFlags, Values, Weed, WEED_ABI_VERSION};
//!
//! let weed = Weed::init(WEED_ABI_VERSION, InitFlags::empty()).unwrap();
//! let plant = weed.plant_new(42);
//!
//! plant.set("width", Values::from(vec![640_i32])).unwrap();
//! assert_eq!(plant.get_value::<i32>("width").unwrap(), 640);
//! assert_eq!(plant.plant_type().unwrap(), 42);
//! ```
//!
//! ## Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`bootstrap`] | ABI negotiation, init flags, derived constants |
//! | [`api`] | Function tables published to plugins and hosts |
//! | [`plant`] | The plant, its lookup/mutation/deletion protocols |
//! | [`value`] | Element storage and byte encoding |
//! | [`seed`] | Seed type tags |
//! | [`utils`] | Typed accessors and copy helpers |

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod tracing_helpers;

pub mod api;
pub mod bootstrap;
pub mod counters;
pub mod error;
pub mod flags;
pub mod key;
mod leaf;
mod ordering;
pub mod plant;
pub mod seed;
pub mod utils;
pub mod value;

pub use api::{ExtFuncs, HostFuncs, PluginFuncs};
pub use bootstrap::{Config, InitFlags, WEED_ABI_VERSION, WEED_ABI_VERSION_MIN, Weed};
pub use counters::{DebugCounters, debug_counters, reset_debug_counters};
pub use error::{WeedError, WeedResult};
pub use flags::LeafFlags;
pub use plant::{Plant, PrivateData};
pub use seed::{CustomSeed, SeedType};
pub use utils::{SeedValue, add_plant_flags, clear_plant_flags, leaf_copy, plant_copy};
pub use value::{PlantPtr, RawPtr, Value, Values};
