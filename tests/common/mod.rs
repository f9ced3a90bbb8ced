//! Shared helpers for the integration tests: tracing setup and plant
//! fixtures.
//!
//! # Tracing
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     let plant = common::plant(1);
//! }
//! ```
//!
//! Environment variables:
//! - `RUST_LOG`: filter directives (e.g. `weed=debug,weed::plant::delete=trace`)
//! - `WEED_LOG_DIR`: log directory (default `logs/`)
//! - `WEED_LOG_CONSOLE`: `0` disables console output
//!
//! Library events only appear when the crate is built with `--features tracing`.
//! The file layer writes `weed.jsonl` as NDJSON:
//!
//! ```bash
//! jq 'select(.fields.key == "y")' logs/weed.jsonl
//! jq 'select(.level == "WARN")' logs/weed.jsonl
//! ```

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Once};
use std::thread;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use weed::{InitFlags, Plant, WEED_ABI_VERSION, Weed};

static INIT: Once = Once::new();

/// Install the console + file subscriber once per test binary.
pub fn init_tracing() {
    INIT.call_once(setup_tracing);
}

#[derive(Debug, Clone)]
struct LogSettings {
    dir: PathBuf,
    console: bool,
    default_level: Level,
}

impl LogSettings {
    fn from_env() -> Self {
        Self {
            dir: env::var("WEED_LOG_DIR").map_or_else(|_| PathBuf::from("logs"), PathBuf::from),
            console: !env::var("WEED_LOG_CONSOLE").is_ok_and(|v| v == "0"),
            default_level: Level::INFO,
        }
    }
}

fn make_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()))
}

fn setup_tracing() {
    let settings = LogSettings::from_env();

    let console_layer = settings.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_thread_names(true)
            .with_target(true)
            .compact()
            .with_filter(make_filter(settings.default_level))
    });

    // A missing or read-only log directory only costs the file layer.
    let file_layer = std::fs::create_dir_all(&settings.dir)
        .and_then(|()| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(settings.dir.join("weed.jsonl"))
        })
        .ok()
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_thread_ids(true)
                .with_target(true)
                .json()
                .with_filter(make_filter(settings.default_level))
        });

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

// ============================================================================
//  Fixtures
// ============================================================================

/// Handle at the newest ABI with `flags`.
pub fn weed(flags: InitFlags) -> Weed {
    Weed::init(WEED_ABI_VERSION, flags).unwrap()
}

/// Fresh plant of `plant_type` with default flags.
pub fn plant(plant_type: i32) -> Arc<Plant> {
    weed(InitFlags::empty()).plant_new(plant_type)
}

/// Run `f(plant, thread_index)` on `threads` threads and collect the results.
pub fn run_on_threads<T, F>(plant: &Arc<Plant>, threads: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&Plant, usize) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let plant = Arc::clone(plant);
            let f = Arc::clone(&f);
            thread::spawn(move || f(&plant, t))
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}
