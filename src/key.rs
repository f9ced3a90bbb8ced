//! Filepath: src/key.rs
//!
//! Leaf keys and their hash.
//!
//! Short keys live inline in the leaf; longer ones are heap-allocated. The
//! hash is computed once at leaf creation and compared before the key bytes
//! during chain walks.

use std::fmt as StdFmt;

/// Key of the head leaf of every plant.
pub const TYPE_KEY: &str = "type";

/// Longest key stored without a heap allocation.
pub const INLINE_KEY_CAPACITY: usize = 22;

/// Hash of a key string (djb2: `h = h * 33 + byte`, seeded with 5381).
///
/// # Example
///
/// ```rust
/// use weed::key::{TYPE_KEY, TYPE_KEY_HASH, key_hash};
///
/// assert_eq!(key_hash(TYPE_KEY), TYPE_KEY_HASH);
/// assert_ne!(key_hash("width"), key_hash("height"));
/// ```
#[must_use]
#[inline]
pub const fn key_hash(key: &str) -> u32 {
    let bytes = key.as_bytes();
    let mut hash: u32 = 5381;
    let mut i = 0;
    while i < bytes.len() {
        hash = hash.wrapping_add(hash << 5).wrapping_add(bytes[i] as u32);
        i += 1;
    }
    hash
}

/// Fixed hash of [`TYPE_KEY`].
pub const TYPE_KEY_HASH: u32 = key_hash(TYPE_KEY);

/// Owned leaf key.
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum LeafKey {
    /// Stored in the leaf itself.
    Inline {
        len: u8,
        bytes: [u8; INLINE_KEY_CAPACITY],
    },

    /// Heap-owned copy.
    Heap(Box<str>),
}

impl LeafKey {
    pub(crate) fn new(key: &str) -> Self {
        if key.len() <= INLINE_KEY_CAPACITY {
            let mut bytes = [0u8; INLINE_KEY_CAPACITY];
            bytes[..key.len()].copy_from_slice(key.as_bytes());

            #[expect(clippy::cast_possible_truncation, reason = "len <= INLINE_KEY_CAPACITY")]
            let len = key.len() as u8;

            Self::Inline { len, bytes }
        } else {
            Self::Heap(key.into())
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        match self {
            Self::Inline { len, bytes } => {
                // SAFETY: the inline bytes were copied from a `&str` of exactly
                // `len` bytes, so they are valid UTF-8.
                unsafe { std::str::from_utf8_unchecked(&bytes[..usize::from(*len)]) }
            }
            Self::Heap(key) => key,
        }
    }

    /// Bytes owned outside the leaf.
    pub(crate) fn heap_bytes(&self) -> usize {
        match self {
            Self::Inline { .. } => 0,
            Self::Heap(key) => key.len(),
        }
    }
}

impl StdFmt::Debug for LeafKey {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        StdFmt::Debug::fmt(self.as_str(), f)
    }
}
