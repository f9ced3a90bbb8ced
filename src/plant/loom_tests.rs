//! Loom tests for the reader-drain barrier.
//!
//! Loom explores every interleaving, so the model is kept to one reader
//! and one deleter: the reader registers while holding a chain-lock probe,
//! the deleter takes the chain lock for writing and waits for registered
//! readers before marking the victim.
//!
//! Run with: `RUSTFLAGS="--cfg loom" cargo test --lib plant::loom_tests`

use loom::sync::atomic::{AtomicBool, Ordering};
use loom::sync::{Arc, Condvar, Mutex, RwLock};
use loom::thread;

struct DrainModel {
    chain_lock: RwLock<()>,
    active: Mutex<usize>,
    drained: Condvar,
    delete_in_progress: AtomicBool,
    victim_deleting: AtomicBool,
}

impl DrainModel {
    fn new() -> Self {
        Self {
            chain_lock: RwLock::new(()),
            active: Mutex::new(0),
            drained: Condvar::new(),
            delete_in_progress: AtomicBool::new(false),
            victim_deleting: AtomicBool::new(false),
        }
    }

    fn register(&self) {
        *self.active.lock().unwrap() += 1;
    }

    fn deregister(&self) {
        let mut active = self.active.lock().unwrap();
        *active -= 1;
        if *active == 0 {
            self.drained.notify_all();
        }
    }

    /// Registered (normal-mode) reads return whether the victim was marked;
    /// checkmode reads return `None`.
    fn read(&self) -> Option<bool> {
        let registered = match self.chain_lock.try_read() {
            Ok(chain) => {
                self.register();
                drop(chain);
                true
            }
            Err(_) if self.delete_in_progress.load(Ordering::SeqCst) => false,
            Err(_) => {
                let chain = self.chain_lock.read().unwrap();
                self.register();
                drop(chain);
                true
            }
        };

        if !registered {
            return None;
        }

        let at_start = self.victim_deleting.load(Ordering::SeqCst);
        let at_end = self.victim_deleting.load(Ordering::SeqCst);
        assert_eq!(
            at_start, at_end,
            "victim marked while a registered reader was walking"
        );
        self.deregister();
        Some(at_end)
    }

    fn delete(&self) {
        self.delete_in_progress.store(true, Ordering::SeqCst);
        {
            let _chain = self.chain_lock.write().unwrap();
            let mut active = self.active.lock().unwrap();
            while *active > 0 {
                active = self.drained.wait(active).unwrap();
            }
            drop(active);
            self.victim_deleting.store(true, Ordering::SeqCst);
        }
        self.delete_in_progress.store(false, Ordering::SeqCst);
    }
}

#[test]
fn test_loom_registered_reader_blocks_marking() {
    loom::model(|| {
        let model = Arc::new(DrainModel::new());

        let reader = {
            let model = Arc::clone(&model);
            thread::spawn(move || model.read())
        };

        model.delete();
        let _ = reader.join().unwrap();
        assert!(model.victim_deleting.load(Ordering::SeqCst));
        assert_eq!(*model.active.lock().unwrap(), 0);
    });
}

#[test]
fn test_loom_reader_after_delete_sees_mark() {
    loom::model(|| {
        let model = Arc::new(DrainModel::new());

        let deleter = {
            let model = Arc::clone(&model);
            thread::spawn(move || model.delete())
        };
        deleter.join().unwrap();

        assert_eq!(model.read(), Some(true));
        assert!(!model.delete_in_progress.load(Ordering::SeqCst));
    });
}
