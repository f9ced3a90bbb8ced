//! Leaf flag bits.
//!
//! # Layout
//! Bit 0: `undeletable` | Bit 1: `immutable` | Bit 2: `proxy`
//! Bits 3-15: reserved | Bits 16-31: host use

use std::fmt as StdFmt;
use std::ops::{BitAnd, BitOr, Not};

/// Leaf cannot be deleted; its value may still change.
const UNDELETABLE_BIT: u32 = 1 << 0;

/// Leaf value cannot change; the leaf may still be deleted.
const IMMUTABLE_BIT: u32 = 1 << 1;

/// Leaf value aliases another leaf's value.
const PROXY_BIT: u32 = 1 << 2;

/// Bits reserved for future library use.
const RESERVED_MASK: u32 = 0x0000_FFF8;

/// Bits free for the host.
const HOST_MASK: u32 = 0xFFFF_0000;

/// Flag set attached to a leaf.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LeafFlags(u32);

impl LeafFlags {
    /// See module docs.
    pub const UNDELETABLE: Self = Self(UNDELETABLE_BIT);
    /// See module docs.
    pub const IMMUTABLE: Self = Self(IMMUTABLE_BIT);
    /// Set by the library on aliased leaves; hosts cannot toggle it.
    pub const PROXY: Self = Self(PROXY_BIT);
    /// All reserved library bits.
    pub const RESERVED: Self = Self(RESERVED_MASK);
    /// All host bits.
    pub const HOST: Self = Self(HOST_MASK);

    /// No flags set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Difference.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// [`LeafFlags::UNDELETABLE`] is set.
    #[must_use]
    pub const fn is_undeletable(self) -> bool {
        self.0 & UNDELETABLE_BIT != 0
    }

    /// [`LeafFlags::IMMUTABLE`] is set.
    #[must_use]
    pub const fn is_immutable(self) -> bool {
        self.0 & IMMUTABLE_BIT != 0
    }

    /// [`LeafFlags::PROXY`] is set.
    #[must_use]
    pub const fn is_proxy(self) -> bool {
        self.0 & PROXY_BIT != 0
    }
}

impl BitOr for LeafFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl BitAnd for LeafFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for LeafFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl StdFmt::Debug for LeafFlags {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("LeafFlags")
            .field("undeletable", &self.is_undeletable())
            .field("immutable", &self.is_immutable())
            .field("proxy", &self.is_proxy())
            .field("bits", &format_args!("{:#010x}", self.0))
            .finish()
    }
}
