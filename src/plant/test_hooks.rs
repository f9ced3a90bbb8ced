//! Test hooks for deterministic concurrency testing.
//!
//! Hooks let unit tests park a thread at a specific point of the insert or
//! delete protocol to force an interleaving.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::{Arc, Barrier};
//!
//! // Both inserters finish pass 1 (key absent) before either starts pass 2.
//! let barrier = Arc::new(Barrier::new(2));
//! plant.hooks().set_between_passes(move || {
//!     barrier.wait();
//! });
//! ```
//!
//! Hooks are per plant and only exist in test builds. A hook is cloned out of
//! its slot before it runs, so several threads can sit inside the same hook.

use std::sync::Arc;

use parking_lot::Mutex;

/// Hook type: a shared closure that takes no arguments.
pub type TestHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct Hooks {
    /// Runs after an insert's first pass found the key absent.
    between_passes: Mutex<Option<TestHook>>,

    /// Runs after a deleter drained readers, right before it unlinks.
    before_unlink: Mutex<Option<TestHook>>,
}

impl Hooks {
    pub fn set_between_passes(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.between_passes.lock() = Some(Arc::new(hook));
    }

    pub fn set_before_unlink(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.before_unlink.lock() = Some(Arc::new(hook));
    }

    /// Clear all hooks.
    pub fn clear(&self) {
        *self.between_passes.lock() = None;
        *self.before_unlink.lock() = None;
    }

    pub(super) fn call_between_passes(&self) {
        let hook = self.between_passes.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    pub(super) fn call_before_unlink(&self) {
        let hook = self.before_unlink.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}
