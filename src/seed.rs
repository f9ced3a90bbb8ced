//! Seed types: the type tag carried by every leaf.
//!
//! The numeric codes are part of the plugin ABI.

use std::fmt as StdFmt;

/// Code of the `int` seed (32-bit signed).
pub const WEED_SEED_INT: i32 = 1;
/// Code of the `double` seed.
pub const WEED_SEED_DOUBLE: i32 = 2;
/// Code of the `boolean` seed.
pub const WEED_SEED_BOOLEAN: i32 = 3;
/// Code of the `string` seed.
pub const WEED_SEED_STRING: i32 = 4;
/// Code of the `int64` seed.
pub const WEED_SEED_INT64: i32 = 5;
/// Code of the function pointer seed.
pub const WEED_SEED_FUNCPTR: i32 = 64;
/// Code of the void pointer seed.
pub const WEED_SEED_VOIDPTR: i32 = 65;
/// Code of the plant pointer seed.
pub const WEED_SEED_PLANTPTR: i32 = 66;
/// First code available for host-defined seeds.
pub const WEED_SEED_FIRST_CUSTOM: i32 = 1024;

/// Code of a host-defined seed.
///
/// Only constructible for codes at or above [`WEED_SEED_FIRST_CUSTOM`], so a
/// custom seed can never alias a built-in one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomSeed(i32);

impl CustomSeed {
    /// `None` for codes below the custom range.
    #[must_use]
    pub const fn new(code: i32) -> Option<Self> {
        if code >= WEED_SEED_FIRST_CUSTOM {
            Some(Self(code))
        } else {
            None
        }
    }

    /// Numeric ABI code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }
}

/// Type tag of a leaf's elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeedType {
    /// 32-bit signed integer.
    Int,
    /// 64-bit float.
    Double,
    /// Boolean, stored as a 32-bit integer in the byte encoding.
    Boolean,
    /// Owned UTF-8 string (may be null).
    String,
    /// 64-bit signed integer.
    Int64,
    /// Opaque function pointer.
    FuncPtr,
    /// Opaque data pointer.
    VoidPtr,
    /// Non-owning reference to another plant.
    PlantPtr,
    /// Host-defined seed; the code is always >= [`WEED_SEED_FIRST_CUSTOM`].
    Custom(CustomSeed),
}

impl SeedType {
    /// Numeric ABI code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Int => WEED_SEED_INT,
            Self::Double => WEED_SEED_DOUBLE,
            Self::Boolean => WEED_SEED_BOOLEAN,
            Self::String => WEED_SEED_STRING,
            Self::Int64 => WEED_SEED_INT64,
            Self::FuncPtr => WEED_SEED_FUNCPTR,
            Self::VoidPtr => WEED_SEED_VOIDPTR,
            Self::PlantPtr => WEED_SEED_PLANTPTR,
            Self::Custom(custom) => custom.code(),
        }
    }

    /// Parse an ABI code. Unknown codes below the custom range yield `None`.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            WEED_SEED_INT => Some(Self::Int),
            WEED_SEED_DOUBLE => Some(Self::Double),
            WEED_SEED_BOOLEAN => Some(Self::Boolean),
            WEED_SEED_STRING => Some(Self::String),
            WEED_SEED_INT64 => Some(Self::Int64),
            WEED_SEED_FUNCPTR => Some(Self::FuncPtr),
            WEED_SEED_VOIDPTR => Some(Self::VoidPtr),
            WEED_SEED_PLANTPTR => Some(Self::PlantPtr),
            c => Self::custom(c),
        }
    }

    /// Build a custom seed, rejecting codes outside the custom range.
    #[must_use]
    pub const fn custom(code: i32) -> Option<Self> {
        match CustomSeed::new(code) {
            Some(custom) => Some(Self::Custom(custom)),
            None => None,
        }
    }

    /// Pointer-family seeds store the pointer value itself, never the pointee.
    ///
    /// Custom seeds count as pointer-family for storage purposes.
    #[must_use]
    pub const fn is_ptr(self) -> bool {
        matches!(
            self,
            Self::FuncPtr | Self::VoidPtr | Self::PlantPtr | Self::Custom(_)
        )
    }

    /// Whether this is a host-defined seed.
    #[must_use]
    pub const fn is_custom(self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Encoded width of one element, or `None` for strings (variable width).
    #[must_use]
    pub const fn fixed_width(self, pointer_width: usize) -> Option<usize> {
        match self {
            Self::Int | Self::Boolean => Some(4),
            Self::Double | Self::Int64 => Some(8),
            Self::String => None,
            Self::FuncPtr | Self::VoidPtr | Self::PlantPtr | Self::Custom(_) => Some(pointer_width),
        }
    }
}

impl StdFmt::Display for SeedType {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Double => write!(f, "double"),
            Self::Boolean => write!(f, "boolean"),
            Self::String => write!(f, "string"),
            Self::Int64 => write!(f, "int64"),
            Self::FuncPtr => write!(f, "funcptr"),
            Self::VoidPtr => write!(f, "voidptr"),
            Self::PlantPtr => write!(f, "plantptr"),
            Self::Custom(custom) => write!(f, "custom({})", custom.code()),
        }
    }
}
