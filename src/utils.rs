//! Typed accessors and whole-plant helpers built on the core operations.
//!
//! Nothing here takes a lock of its own: every helper is a sequence of
//! public plant operations, so each step is individually atomic but a
//! multi-step helper (such as [`plant_copy`]) is not atomic as a whole.

use std::sync::Arc;

use crate::error::{WeedError, WeedResult};
use crate::flags::LeafFlags;
use crate::key::TYPE_KEY;
use crate::plant::Plant;
use crate::seed::SeedType;
use crate::value::{PlantPtr, RawPtr, Value, Values};

// ============================================================================
//  SeedValue
// ============================================================================

/// Rust types that map onto exactly one seed type.
pub trait SeedValue: Sized {
    /// Seed type of leaves holding `Self`.
    const SEED: SeedType;

    /// Wrap elements into a leaf value.
    fn into_values(items: Vec<Self>) -> Values;

    /// Unwrap one element; `None` on a seed mismatch.
    fn from_value(value: Value) -> Option<Self>;

    /// Unwrap every element; `None` on a seed mismatch.
    fn from_values(values: Values) -> Option<Vec<Self>>;
}

macro_rules! scalar_seed_value {
    ($ty:ty, $seed:ident) => {
        impl SeedValue for $ty {
            const SEED: SeedType = SeedType::$seed;

            fn into_values(items: Vec<Self>) -> Values {
                Values::$seed(items)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$seed(v) => Some(v),
                    _ => None,
                }
            }

            fn from_values(values: Values) -> Option<Vec<Self>> {
                match values {
                    Values::$seed(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

scalar_seed_value!(i32, Int);
scalar_seed_value!(i64, Int64);
scalar_seed_value!(f64, Double);
scalar_seed_value!(bool, Boolean);
scalar_seed_value!(PlantPtr, PlantPtr);

// Plain pointers are void pointers.
scalar_seed_value!(RawPtr, VoidPtr);

/// Null strings read back as empty strings.
impl SeedValue for String {
    const SEED: SeedType = SeedType::String;

    fn into_values(items: Vec<Self>) -> Values {
        Values::String(items.into_iter().map(Some).collect())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(v) => Some(v.unwrap_or_default()),
            _ => None,
        }
    }

    fn from_values(values: Values) -> Option<Vec<Self>> {
        match values {
            Values::String(v) => Some(v.into_iter().map(Option::unwrap_or_default).collect()),
            _ => None,
        }
    }
}

// ============================================================================
//  Typed accessors
// ============================================================================

impl Plant {
    /// Whether leaf `key` exists.
    #[must_use]
    pub fn has_leaf(&self, key: &str) -> bool {
        self.seed_type(key).is_some()
    }

    /// The plant's type, from its `"type"` leaf.
    ///
    /// # Errors
    /// [`WeedError::NoSuchLeaf`] once the plant has been freed.
    pub fn plant_type(&self) -> WeedResult<i32> {
        self.get_value(TYPE_KEY)
    }

    /// Set leaf `key` to the single element `value`.
    ///
    /// # Errors
    /// As [`Plant::set`].
    pub fn set_value<T: SeedValue>(&self, key: &str, value: T) -> WeedResult<()> {
        self.set(key, T::into_values(vec![value]))
    }

    /// Set leaf `key` to `items`.
    ///
    /// # Errors
    /// As [`Plant::set`].
    pub fn set_array<T: SeedValue>(&self, key: &str, items: Vec<T>) -> WeedResult<()> {
        self.set(key, T::into_values(items))
    }

    /// First element of leaf `key`.
    ///
    /// # Errors
    /// - [`WeedError::NoSuchLeaf`] if the key is absent.
    /// - [`WeedError::WrongSeedType`] if the leaf does not hold `T`.
    /// - [`WeedError::NoSuchElement`] if the leaf has no elements.
    pub fn get_value<T: SeedValue>(&self, key: &str) -> WeedResult<T> {
        let value = self.with_values(key, |values| {
            if values.seed_type() != T::SEED {
                return Err(WeedError::WrongSeedType);
            }
            values.get(0).ok_or(WeedError::NoSuchElement)
        })?;
        T::from_value(value).ok_or(WeedError::WrongSeedType)
    }

    /// Every element of leaf `key`.
    ///
    /// # Errors
    /// - [`WeedError::NoSuchLeaf`] if the key is absent.
    /// - [`WeedError::WrongSeedType`] if the leaf does not hold `T`.
    pub fn get_array<T: SeedValue>(&self, key: &str) -> WeedResult<Vec<T>> {
        let values = self.with_values(key, |values| {
            if values.seed_type() == T::SEED {
                Ok(values.clone())
            } else {
                Err(WeedError::WrongSeedType)
            }
        })?;
        T::from_values(values).ok_or(WeedError::WrongSeedType)
    }
}

// ============================================================================
//  Whole-leaf and whole-plant helpers
// ============================================================================

/// Copy the value of `src_key` in `src` to `dst_key` in `dst`.
///
/// Seed type and element count (including zero) are preserved. `dst` and
/// `src` may be the same plant.
///
/// # Errors
/// - [`WeedError::NoSuchLeaf`] if the source is absent; `dst` is untouched.
/// - Any error of [`Plant::set`] on the destination.
pub fn leaf_copy(dst: &Plant, dst_key: &str, src: &Plant, src_key: &str) -> WeedResult<()> {
    let values = src.get_all(src_key)?;
    dst.set(dst_key, values)
}

/// A new plant of the same type and configuration holding a copy of every
/// leaf of `src`. Only values are copied; flags and private data are not.
///
/// Leaves deleted from `src` while the copy runs are skipped.
///
/// # Errors
/// [`WeedError::NoSuchLeaf`] if `src` has been freed.
pub fn plant_copy(src: &Plant) -> WeedResult<Arc<Plant>> {
    let copy = Plant::new(src.config(), src.plant_type()?);

    for key in src.list_leaves() {
        if key == TYPE_KEY {
            continue;
        }
        match leaf_copy(&copy, &key, src, &key) {
            Ok(()) | Err(WeedError::NoSuchLeaf) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(copy)
}

/// Set `flags` on every leaf except `"type"`.
///
/// Leaves deleted while the update runs are skipped.
///
/// # Errors
/// Any error of [`Plant::set_flags`] other than [`WeedError::NoSuchLeaf`].
pub fn add_plant_flags(plant: &Plant, flags: LeafFlags) -> WeedResult<()> {
    update_plant_flags(plant, |current| current | flags)
}

/// Clear `flags` on every leaf except `"type"`.
///
/// # Errors
/// As [`add_plant_flags`].
pub fn clear_plant_flags(plant: &Plant, flags: LeafFlags) -> WeedResult<()> {
    update_plant_flags(plant, |current| current.without(flags))
}

fn update_plant_flags(plant: &Plant, f: impl Fn(LeafFlags) -> LeafFlags) -> WeedResult<()> {
    for key in plant.list_leaves() {
        if key == TYPE_KEY {
            continue;
        }
        match plant.set_flags(&key, f(plant.flags(&key))) {
            Ok(()) | Err(WeedError::NoSuchLeaf) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
