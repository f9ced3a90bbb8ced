//! Feature-gated logging macros.
//!
//! With the `tracing` feature the macros emit `tracing` events with the
//! caller's module as target, so filters such as
//! `RUST_LOG=weed::plant::delete=trace` work. Without it they expand to
//! nothing and the store carries no logging code at all.
//!
//! ```bash
//! cargo test --features tracing racing_inserts
//! RUST_LOG=weed=debug cargo test --features tracing --test concurrent_regression
//! ```
//!
//! Levels used by the store:
//!
//! | Level | Events |
//! |-------|--------|
//! | `trace` | leaf linked, unlinked, freed; plant dropped |
//! | `debug` | negotiated config, insert races, aborted writes, plant free |
//! | `warn` | rejected ABI versions, refused frees |
//!
//! Fields are structured (`key = ...`), never interpolated into the message.

#![allow(unused_macros, unused_imports)]

/// Emit one event at `$level`.
#[cfg(feature = "tracing")]
macro_rules! weed_event {
    ($level:ident, $($arg:tt)*) => {
        ::tracing::$level!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! weed_event {
    ($level:ident, $($arg:tt)*) => {};
}

macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::tracing_helpers::weed_event!(trace, $($arg)*)
    };
}

macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::tracing_helpers::weed_event!(debug, $($arg)*)
    };
}

macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::tracing_helpers::weed_event!(warn, $($arg)*)
    };
}

pub(crate) use debug_log;
pub(crate) use trace_log;
pub(crate) use warn_log;
pub(crate) use weed_event;
