//! ABI negotiation and behavior flags.
//!
//! [`Weed::init`] is the only way to obtain a [`Weed`] handle, and plants can
//! only be created through one, so no operation can run before a successful
//! init. The negotiated [`Config`] is copied into every plant and never
//! changes afterwards.
//!
//! | ABI | Changes |
//! |-----|---------|
//! | 200 | Base plugin table |
//! | 201 | `leaf_append` and `leaf_get_all` published to plugins |
//! | 202 | Null-terminated string encoding by default |

use std::ops::BitOr;
use std::sync::{Arc, OnceLock};

use crate::api::{HostFuncs, PluginFuncs};
use crate::error::{WeedError, WeedResult};
use crate::plant::Plant;
use crate::tracing_helpers::{debug_log, warn_log};
use crate::value::Encoding;

/// Oldest supported ABI.
pub const WEED_ABI_VERSION_MIN: i32 = 200;

/// Newest supported ABI.
pub const WEED_ABI_VERSION: i32 = 202;

/// First ABI publishing append/get-all to plugins.
pub(crate) const ABI_APPEND: i32 = 201;

/// First ABI with null-terminated strings by default.
pub(crate) const ABI_TERMINATED_STRINGS: i32 = 202;

/// Environment variable that forces [`InitFlags::DEBUG`] on.
pub const DEBUG_ENV_VAR: &str = "LIBWEED_DEBUG";

// ============================================================================
//  InitFlags
// ============================================================================

/// Behavior flags selected by the host at init.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InitFlags(u32);

impl InitFlags {
    /// Apply fixes from newer ABIs to an older one (terminated strings).
    pub const BACKPORT_BUGFIXES: Self = Self(1 << 0);
    /// Trace the negotiated configuration at init.
    pub const DEBUG: Self = Self(1 << 1);
    /// Publish the extended host functions.
    pub const EXTENDED_FUNCTIONS: Self = Self(1 << 2);
    /// Readers yield to waiting writers on the structural lock probe.
    pub const WRITER_PREFERENCE: Self = Self(1 << 3);
    /// Trust key hashes without comparing key bytes.
    pub const SKIP_ERROR_CHECKS: Self = Self(1 << 4);

    const ALL: u32 = 0b1_1111;

    /// No flags.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from raw bits; unknown bits are dropped.
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    /// Raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for InitFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ============================================================================
//  Config
// ============================================================================

/// Negotiated configuration, fixed for the lifetime of a [`Weed`] handle.
///
/// Only [`Weed::init`] produces one; there is no way to build a plant from a
/// configuration that was not negotiated.
///
/// ```compile_fail
/// use weed::{Config, Plant};
///
/// let plant = Plant::new(Config::default(), 5);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    abi_version: i32,
    flags: InitFlags,
}

impl Config {
    /// Negotiated ABI version.
    #[must_use]
    pub const fn abi_version(self) -> i32 {
        self.abi_version
    }

    /// Flags in effect, including a debug flag forced by the environment.
    #[must_use]
    pub const fn flags(self) -> InitFlags {
        self.flags
    }

    /// Whether strings carry a trailing NUL in sizes and byte encodings.
    #[must_use]
    pub const fn null_terminated_strings(self) -> bool {
        self.abi_version >= ABI_TERMINATED_STRINGS
            || self.flags.contains(InitFlags::BACKPORT_BUGFIXES)
    }

    /// Width of pointer-family elements in the byte encoding.
    #[must_use]
    pub const fn pointer_width(self) -> usize {
        size_of::<usize>()
    }

    /// Whether [`ExtFuncs`](crate::ExtFuncs) is published to the host.
    #[must_use]
    pub const fn extended_functions(self) -> bool {
        self.flags.contains(InitFlags::EXTENDED_FUNCTIONS)
    }

    /// Whether readers yield to waiting deleters.
    #[must_use]
    pub const fn writer_preference(self) -> bool {
        self.flags.contains(InitFlags::WRITER_PREFERENCE)
    }

    /// Hash-only key matching during chain walks.
    #[must_use]
    pub const fn skip_key_compare(self) -> bool {
        self.flags.contains(InitFlags::SKIP_ERROR_CHECKS)
    }

    /// Debug diagnostics enabled.
    #[must_use]
    pub const fn debug(self) -> bool {
        self.flags.contains(InitFlags::DEBUG)
    }

    /// Byte encoding constants derived from this configuration.
    #[must_use]
    pub const fn encoding(self) -> Encoding {
        Encoding {
            string_terminator: if self.null_terminated_strings() { 1 } else { 0 },
            pointer_width: self.pointer_width(),
        }
    }
}

fn debug_forced_by_env() -> bool {
    static FORCED: OnceLock<bool> = OnceLock::new();
    *FORCED.get_or_init(|| {
        std::env::var(DEBUG_ENV_VAR)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

// ============================================================================
//  Weed
// ============================================================================

/// Handle proving a successful init; the factory for plants and tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Weed {
    config: Config,
}

impl Weed {
    /// Negotiate an ABI version and behavior flags.
    ///
    /// # Errors
    /// [`WeedError::BadVersion`] if `abi_version` is outside
    /// [`WEED_ABI_VERSION_MIN`]`..=`[`WEED_ABI_VERSION`].
    pub fn init(abi_version: i32, flags: InitFlags) -> WeedResult<Self> {
        if !(WEED_ABI_VERSION_MIN..=WEED_ABI_VERSION).contains(&abi_version) {
            warn_log!(abi_version, "rejected unsupported ABI version");
            return Err(WeedError::BadVersion(abi_version));
        }

        let flags = if debug_forced_by_env() {
            flags | InitFlags::DEBUG
        } else {
            flags
        };

        let config = Config {
            abi_version,
            flags,
        };

        if config.debug() {
            debug_log!(
                abi_version,
                null_terminated_strings = config.null_terminated_strings(),
                pointer_width = config.pointer_width(),
                extended_functions = config.extended_functions(),
                writer_preference = config.writer_preference(),
                skip_key_compare = config.skip_key_compare(),
                "weed initialised"
            );
        }

        Ok(Self { config })
    }

    /// The negotiated configuration.
    #[must_use]
    pub const fn config(&self) -> Config {
        self.config
    }

    /// Create a plant of the given type, pre-seeded with its `"type"` leaf.
    #[must_use]
    pub fn plant_new(&self, plant_type: i32) -> Arc<Plant> {
        Plant::new(self.config, plant_type)
    }

    /// Function table for plugins at the negotiated ABI.
    #[must_use]
    pub fn plugin_funcs(&self) -> PluginFuncs {
        PluginFuncs::for_config(self.config)
    }

    /// Function table for the host, including host-only operations.
    #[must_use]
    pub fn host_funcs(&self) -> HostFuncs {
        HostFuncs::for_config(self.config)
    }
}
