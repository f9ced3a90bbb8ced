//! Standard memory orderings for the plant/leaf state words.
//!
//! These constants keep ordering usage consistent across the codebase and
//! make the intent clear at each access point.

use std::sync::atomic::Ordering;

/// Ordering for reading a leaf's `deleting` mark or flag word.
/// Pairs with the writer's Release stores.
pub const READ_ORD: Ordering = Ordering::Acquire;

/// Ordering for publishing a `deleting` mark or flag word.
/// Pairs with reader's Acquire loads.
pub const WRITE_ORD: Ordering = Ordering::Release;

/// Ordering for the plant's delete-in-progress flag.
/// Readers that fail the chain-lock probe must see it set.
pub const DELETE_FLAG_ORD: Ordering = Ordering::SeqCst;

/// Ordering for statistics counters; no synchronization implied.
pub const RELAXED: Ordering = Ordering::Relaxed;
