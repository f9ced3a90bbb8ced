//! Non-check reader registry.
//!
//! Normal-mode lookups register here for the duration of their walk. A
//! deleter that already holds the plant's chain write-lock (so no new
//! normal-mode reader can register) waits for the count to drain to zero
//! before it rewrites any link.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub(crate) struct ReaderCount {
    active: Mutex<usize>,
    drained: Condvar,
}

/// Registration of one normal-mode reader; deregisters on drop.
#[must_use = "dropping the registration immediately ends the read"]
pub(crate) struct ReaderRegistration<'a> {
    count: &'a ReaderCount,
}

impl ReaderCount {
    pub(crate) fn register(&self) -> ReaderRegistration<'_> {
        *self.active.lock() += 1;
        ReaderRegistration { count: self }
    }

    /// Block until every registered reader has left.
    pub(crate) fn wait_for_drain(&self) {
        let mut active = self.active.lock();
        while *active > 0 {
            self.drained.wait(&mut active);
        }
    }

    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        *self.active.lock()
    }
}

impl Drop for ReaderRegistration<'_> {
    fn drop(&mut self) {
        let mut active = self.count.active.lock();
        *active -= 1;
        if *active == 0 {
            self.count.drained.notify_all();
        }
    }
}
