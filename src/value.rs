//! Value types for leaf storage.
//!
//! This module provides:
//! - [`Values`]: the homogeneous element array held by a leaf
//! - [`Value`]: a single element copied out of a leaf
//! - [`RawPtr`] / [`PlantPtr`]: pointer-family payloads
//!
//! Scalars are stored by value. Strings are owned copies and never alias the
//! caller's memory. Pointer-family seeds store the pointer itself.

use std::mem;
use std::sync::{Arc, Weak};

use crate::error::{WeedError, WeedResult};
use crate::plant::Plant;
use crate::seed::{CustomSeed, SeedType};

// ============================================================================
//  Pointer payloads
// ============================================================================

/// Opaque pointer value (void pointers, function pointers, custom seeds).
///
/// The store never dereferences it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawPtr(usize);

impl RawPtr {
    /// The null pointer.
    pub const NULL: Self = Self(0);

    /// Capture a pointer, exposing its provenance.
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr.expose_provenance())
    }

    /// Recover the pointer.
    #[must_use]
    pub fn as_ptr<T>(self) -> *mut T {
        std::ptr::with_exposed_provenance_mut(self.0)
    }

    /// Raw address.
    #[must_use]
    pub const fn addr(self) -> usize {
        self.0
    }

    /// Build from a raw address (no provenance).
    #[must_use]
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    /// Whether the address is zero.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Non-owning reference to a plant.
///
/// Storing a plant pointer never keeps the target alive; once the target is
/// dropped, [`PlantPtr::upgrade`] returns `None`.
#[derive(Clone, Debug, Default)]
pub struct PlantPtr(Weak<Plant>);

impl PlantPtr {
    /// Point at `plant`.
    #[must_use]
    pub fn new(plant: &Arc<Plant>) -> Self {
        Self(Arc::downgrade(plant))
    }

    /// The null plant pointer.
    #[must_use]
    pub const fn null() -> Self {
        Self(Weak::new())
    }

    /// Resolve the target if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Arc<Plant>> {
        self.0.upgrade()
    }

    /// True for the null pointer and for pointers whose target is gone.
    #[must_use]
    pub fn is_dangling(&self) -> bool {
        self.0.strong_count() == 0
    }

    /// Whether this points at `plant`.
    #[must_use]
    pub fn points_to(&self, plant: &Arc<Plant>) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(plant))
    }

    fn addr(&self) -> usize {
        if self.0.strong_count() == 0 {
            0
        } else {
            self.0.as_ptr().addr()
        }
    }
}

impl PartialEq for PlantPtr {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for PlantPtr {}

// ============================================================================
//  Value - one element
// ============================================================================

/// A single element copied out of a leaf.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `int` element.
    Int(i32),
    /// `double` element.
    Double(f64),
    /// `boolean` element.
    Boolean(bool),
    /// `None` is a null string, distinct from `Some(String::new())`.
    String(Option<String>),
    /// `int64` element.
    Int64(i64),
    /// Function pointer element.
    FuncPtr(RawPtr),
    /// Void pointer element.
    VoidPtr(RawPtr),
    /// Plant pointer element.
    PlantPtr(PlantPtr),
    /// Element of a host-defined seed.
    Custom(CustomSeed, RawPtr),
}

impl Value {
    /// Seed type of this element.
    #[must_use]
    pub const fn seed_type(&self) -> SeedType {
        match self {
            Self::Int(_) => SeedType::Int,
            Self::Double(_) => SeedType::Double,
            Self::Boolean(_) => SeedType::Boolean,
            Self::String(_) => SeedType::String,
            Self::Int64(_) => SeedType::Int64,
            Self::FuncPtr(_) => SeedType::FuncPtr,
            Self::VoidPtr(_) => SeedType::VoidPtr,
            Self::PlantPtr(_) => SeedType::PlantPtr,
            Self::Custom(seed, _) => SeedType::Custom(*seed),
        }
    }
}

// ============================================================================
//  Encoding parameters
// ============================================================================

/// Byte-level encoding constants negotiated at init.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Encoding {
    /// Bytes appended after each non-null string (0 or 1).
    pub string_terminator: usize,
    /// Width of pointer-family elements.
    pub pointer_width: usize,
}

impl Default for Encoding {
    fn default() -> Self {
        Self {
            string_terminator: 1,
            pointer_width: mem::size_of::<usize>(),
        }
    }
}

// ============================================================================
//  Values - the element array
// ============================================================================

/// Homogeneous element array of one leaf.
///
/// The variant is the seed type; an empty vector is a valid zero-element
/// value that still carries its seed.
#[derive(Clone, Debug, PartialEq)]
pub enum Values {
    /// `int` elements.
    Int(Vec<i32>),
    /// `double` elements.
    Double(Vec<f64>),
    /// `boolean` elements.
    Boolean(Vec<bool>),
    /// `string` elements; `None` entries are null strings.
    String(Vec<Option<String>>),
    /// `int64` elements.
    Int64(Vec<i64>),
    /// Function pointer elements.
    FuncPtr(Vec<RawPtr>),
    /// Void pointer elements.
    VoidPtr(Vec<RawPtr>),
    /// Non-owning plant references.
    PlantPtr(Vec<PlantPtr>),
    /// Elements of a host-defined seed.
    Custom {
        /// The seed, always in the custom range.
        seed: CustomSeed,
        /// Opaque pointer values.
        items: Vec<RawPtr>,
    },
}

/// Apply the same expression to the vector inside every variant.
macro_rules! each_vec {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            Values::Int($v) => $body,
            Values::Double($v) => $body,
            Values::Boolean($v) => $body,
            Values::String($v) => $body,
            Values::Int64($v) => $body,
            Values::FuncPtr($v) => $body,
            Values::VoidPtr($v) => $body,
            Values::PlantPtr($v) => $body,
            Values::Custom { items: $v, .. } => $body,
        }
    };
}

/// Concatenate into a freshly allocated vector; `old` is untouched on failure.
fn combine<T: Clone>(old: &[T], new: Vec<T>) -> WeedResult<Vec<T>> {
    let total = old
        .len()
        .checked_add(new.len())
        .ok_or(WeedError::MemoryAllocation)?;

    let mut combined: Vec<T> = Vec::new();
    combined
        .try_reserve_exact(total)
        .map_err(|_| WeedError::MemoryAllocation)?;
    combined.extend_from_slice(old);
    combined.extend(new);
    Ok(combined)
}

impl Values {
    /// Zero-element value of the given seed.
    #[must_use]
    pub const fn empty(seed: SeedType) -> Self {
        match seed {
            SeedType::Int => Self::Int(Vec::new()),
            SeedType::Double => Self::Double(Vec::new()),
            SeedType::Boolean => Self::Boolean(Vec::new()),
            SeedType::String => Self::String(Vec::new()),
            SeedType::Int64 => Self::Int64(Vec::new()),
            SeedType::FuncPtr => Self::FuncPtr(Vec::new()),
            SeedType::VoidPtr => Self::VoidPtr(Vec::new()),
            SeedType::PlantPtr => Self::PlantPtr(Vec::new()),
            SeedType::Custom(seed) => Self::Custom {
                seed,
                items: Vec::new(),
            },
        }
    }

    /// Elements of a host-defined seed.
    ///
    /// # Errors
    /// [`WeedError::WrongSeedType`] if `seed` is not a custom seed.
    pub fn custom(seed: SeedType, items: Vec<RawPtr>) -> WeedResult<Self> {
        match seed {
            SeedType::Custom(seed) => Ok(Self::Custom { seed, items }),
            _ => Err(WeedError::WrongSeedType),
        }
    }

    /// Void pointer elements.
    #[must_use]
    pub const fn void_ptrs(items: Vec<RawPtr>) -> Self {
        Self::VoidPtr(items)
    }

    /// Function pointer elements.
    #[must_use]
    pub const fn func_ptrs(items: Vec<RawPtr>) -> Self {
        Self::FuncPtr(items)
    }

    /// Plant pointer elements.
    #[must_use]
    pub fn plant_ptrs(plants: &[&Arc<Plant>]) -> Self {
        Self::PlantPtr(plants.iter().map(|p| PlantPtr::new(p)).collect())
    }

    /// Seed type of the elements.
    #[must_use]
    pub const fn seed_type(&self) -> SeedType {
        match self {
            Self::Int(_) => SeedType::Int,
            Self::Double(_) => SeedType::Double,
            Self::Boolean(_) => SeedType::Boolean,
            Self::String(_) => SeedType::String,
            Self::Int64(_) => SeedType::Int64,
            Self::FuncPtr(_) => SeedType::FuncPtr,
            Self::VoidPtr(_) => SeedType::VoidPtr,
            Self::PlantPtr(_) => SeedType::PlantPtr,
            Self::Custom { seed, .. } => SeedType::Custom(*seed),
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        each_vec!(self, v => v.len())
    }

    /// Whether there are no elements. The seed is kept either way.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out element `idx`.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<Value> {
        Some(match self {
            Self::Int(v) => Value::Int(*v.get(idx)?),
            Self::Double(v) => Value::Double(*v.get(idx)?),
            Self::Boolean(v) => Value::Boolean(*v.get(idx)?),
            Self::String(v) => Value::String(v.get(idx)?.clone()),
            Self::Int64(v) => Value::Int64(*v.get(idx)?),
            Self::FuncPtr(v) => Value::FuncPtr(*v.get(idx)?),
            Self::VoidPtr(v) => Value::VoidPtr(*v.get(idx)?),
            Self::PlantPtr(v) => Value::PlantPtr(v.get(idx)?.clone()),
            Self::Custom { seed, items } => Value::Custom(*seed, *items.get(idx)?),
        })
    }

    /// Encoded size of element `idx`.
    ///
    /// Strings report their byte length plus the negotiated terminator; a
    /// null string reports zero.
    #[must_use]
    pub fn element_size(&self, idx: usize, enc: Encoding) -> Option<usize> {
        if idx >= self.len() {
            return None;
        }

        match self {
            Self::String(v) => Some(
                v[idx]
                    .as_ref()
                    .map_or(0, |s| s.len() + enc.string_terminator),
            ),
            other => other.seed_type().fixed_width(enc.pointer_width),
        }
    }

    /// Append `other` (same seed) through a freshly allocated array.
    ///
    /// On failure `self` is left exactly as it was.
    ///
    /// # Errors
    /// - [`WeedError::WrongSeedType`] if the seeds differ.
    /// - [`WeedError::MemoryAllocation`] if the combined array cannot be allocated.
    pub fn append(&mut self, other: Self) -> WeedResult<()> {
        if self.seed_type() != other.seed_type() {
            return Err(WeedError::WrongSeedType);
        }

        match (self, other) {
            (Self::Int(a), Self::Int(b)) => *a = combine(a, b)?,
            (Self::Double(a), Self::Double(b)) => *a = combine(a, b)?,
            (Self::Boolean(a), Self::Boolean(b)) => *a = combine(a, b)?,
            (Self::String(a), Self::String(b)) => *a = combine(a, b)?,
            (Self::Int64(a), Self::Int64(b)) => *a = combine(a, b)?,
            (Self::FuncPtr(a), Self::FuncPtr(b)) => *a = combine(a, b)?,
            (Self::VoidPtr(a), Self::VoidPtr(b)) => *a = combine(a, b)?,
            (Self::PlantPtr(a), Self::PlantPtr(b)) => *a = combine(a, b)?,
            (Self::Custom { items: a, .. }, Self::Custom { items: b, .. }) => *a = combine(a, b)?,
            _ => return Err(WeedError::WrongSeedType),
        }
        Ok(())
    }

    /// Reinterpret the elements under a compatible seed.
    ///
    /// Allowed: any change among `voidptr`, `funcptr` and custom seeds, and
    /// `int` <-> `boolean` (non-zero is `true`).
    ///
    /// # Errors
    /// [`WeedError::WrongSeedType`] for any other combination.
    pub fn recast(&mut self, seed: SeedType) -> WeedResult<()> {
        if self.seed_type() == seed {
            return Ok(());
        }

        let recast = match (&*self, seed) {
            (Self::Int(v), SeedType::Boolean) => Self::Boolean(v.iter().map(|x| *x != 0).collect()),
            (Self::Boolean(v), SeedType::Int) => {
                Self::Int(v.iter().map(|b| i32::from(*b)).collect())
            }
            (Self::VoidPtr(v) | Self::FuncPtr(v) | Self::Custom { items: v, .. }, target)
                if is_raw_ptr_seed(target) =>
            {
                Self::raw_ptrs_of(target, v.clone())
            }
            _ => return Err(WeedError::WrongSeedType),
        };

        *self = recast;
        Ok(())
    }

    fn raw_ptrs_of(seed: SeedType, items: Vec<RawPtr>) -> Self {
        match seed {
            SeedType::FuncPtr => Self::FuncPtr(items),
            SeedType::Custom(seed) => Self::Custom { seed, items },
            _ => Self::VoidPtr(items),
        }
    }

    /// Force element `idx` of a string leaf to `size` encoded bytes.
    ///
    /// Longer strings are cut at the nearest character boundary at or below
    /// `size`; shorter ones are padded with NUL characters.
    ///
    /// # Errors
    /// - [`WeedError::WrongSeedType`] for non-string leaves.
    /// - [`WeedError::NoSuchElement`] if `idx` is out of range.
    pub fn resize_element(&mut self, idx: usize, size: usize) -> WeedResult<()> {
        let Self::String(items) = self else {
            return Err(WeedError::WrongSeedType);
        };
        let slot = items.get_mut(idx).ok_or(WeedError::NoSuchElement)?;
        let text = slot.get_or_insert_with(String::new);

        if text.len() > size {
            let mut cut = size;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        let pad = size.saturating_sub(text.len());
        text.try_reserve_exact(pad)
            .map_err(|_| WeedError::MemoryAllocation)?;
        text.extend(std::iter::repeat_n('\0', pad));
        Ok(())
    }

    /// Encode element `idx` into its ABI byte form.
    ///
    /// Native-endian scalars, booleans as 32-bit 0/1, pointers at the
    /// negotiated width, strings followed by the negotiated terminator.
    #[must_use]
    pub fn encode(&self, idx: usize, enc: Encoding) -> Option<Vec<u8>> {
        let bytes = match self {
            Self::Int(v) => v.get(idx)?.to_ne_bytes().to_vec(),
            Self::Double(v) => v.get(idx)?.to_ne_bytes().to_vec(),
            Self::Boolean(v) => i32::from(*v.get(idx)?).to_ne_bytes().to_vec(),
            Self::Int64(v) => v.get(idx)?.to_ne_bytes().to_vec(),
            Self::String(v) => match v.get(idx)? {
                Some(text) => {
                    let mut out = Vec::with_capacity(text.len() + enc.string_terminator);
                    out.extend_from_slice(text.as_bytes());
                    out.resize(text.len() + enc.string_terminator, 0);
                    out
                }
                None => vec![0; enc.string_terminator],
            },
            Self::FuncPtr(v) | Self::VoidPtr(v) | Self::Custom { items: v, .. } => {
                encode_addr(v.get(idx)?.addr(), enc.pointer_width)
            }
            Self::PlantPtr(v) => encode_addr(v.get(idx)?.addr(), enc.pointer_width),
        };
        Some(bytes)
    }

    /// Approximate heap footprint of the elements.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        let inline = each_vec!(self, v => mem::size_of_val(v.as_slice()));
        let strings = match self {
            Self::String(v) => v.iter().flatten().map(String::capacity).sum(),
            _ => 0,
        };
        inline + strings
    }
}

/// Seeds backed by a plain `RawPtr` array.
const fn is_raw_ptr_seed(seed: SeedType) -> bool {
    matches!(seed, SeedType::VoidPtr | SeedType::FuncPtr | SeedType::Custom(_))
}

fn encode_addr(addr: usize, width: usize) -> Vec<u8> {
    let full = addr.to_ne_bytes();
    let mut out = vec![0u8; width];
    let n = width.min(full.len());
    if cfg!(target_endian = "little") {
        out[..n].copy_from_slice(&full[..n]);
    } else {
        out[width - n..].copy_from_slice(&full[full.len() - n..]);
    }
    out
}

// ============================================================================
//  Conversions
// ============================================================================

impl From<Vec<i32>> for Values {
    fn from(v: Vec<i32>) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<f64>> for Values {
    fn from(v: Vec<f64>) -> Self {
        Self::Double(v)
    }
}

impl From<Vec<bool>> for Values {
    fn from(v: Vec<bool>) -> Self {
        Self::Boolean(v)
    }
}

impl From<Vec<i64>> for Values {
    fn from(v: Vec<i64>) -> Self {
        Self::Int64(v)
    }
}

impl From<Vec<String>> for Values {
    fn from(v: Vec<String>) -> Self {
        Self::String(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for Values {
    fn from(v: Vec<&str>) -> Self {
        Self::String(v.into_iter().map(|s| Some(s.to_owned())).collect())
    }
}

impl From<Vec<Option<String>>> for Values {
    fn from(v: Vec<Option<String>>) -> Self {
        Self::String(v)
    }
}

impl From<Vec<PlantPtr>> for Values {
    fn from(v: Vec<PlantPtr>) -> Self {
        Self::PlantPtr(v)
    }
}

impl From<Value> for Values {
    fn from(value: Value) -> Self {
        match value {
            Value::Int(x) => Self::Int(vec![x]),
            Value::Double(x) => Self::Double(vec![x]),
            Value::Boolean(x) => Self::Boolean(vec![x]),
            Value::String(x) => Self::String(vec![x]),
            Value::Int64(x) => Self::Int64(vec![x]),
            Value::FuncPtr(x) => Self::FuncPtr(vec![x]),
            Value::VoidPtr(x) => Self::VoidPtr(vec![x]),
            Value::PlantPtr(x) => Self::PlantPtr(vec![x]),
            Value::Custom(seed, x) => Self::Custom {
                seed,
                items: vec![x],
            },
        }
    }
}
