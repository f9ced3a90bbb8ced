//! Error codes returned by plant and leaf operations.
//!
//! Every fallible operation returns [`WeedResult`]. The numeric codes from
//! [`WeedError::code`] are stable and shared with plugins, so they must never
//! be renumbered.

use thiserror::Error;

/// Status code for success.
pub const WEED_SUCCESS: i32 = 0;

/// First code of the range reserved for host/plugin defined errors.
pub const WEED_ERROR_FIRST_CUSTOM: i32 = 1024;

/// Errors produced by the plant/leaf engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeedError {
    /// An allocation failed. All partial state was unwound.
    #[error("memory allocation failed")]
    MemoryAllocation,

    /// No leaf with the requested key exists on the plant.
    #[error("no such leaf")]
    NoSuchLeaf,

    /// The element index is out of range, or the operation is not allowed
    /// on the plant's head leaf.
    #[error("no such element")]
    NoSuchElement,

    /// The supplied seed type does not match the leaf's seed type.
    #[error("wrong seed type")]
    WrongSeedType,

    /// The leaf is flagged immutable.
    #[error("leaf is immutable")]
    Immutable,

    /// The leaf (or a leaf of the plant being freed) is flagged undeletable.
    #[error("leaf is undeletable")]
    Undeletable,

    /// Lost a race with a concurrent deletion. Safe to retry.
    #[error("concurrent modification, retry")]
    Concurrency,

    /// The requested ABI version is not supported.
    #[error("unsupported ABI version {0}")]
    BadVersion(i32),

    /// Host or plugin defined error (code >= 1024).
    #[error("custom error {0}")]
    Custom(i32),
}

/// Result alias used throughout the crate.
pub type WeedResult<T> = Result<T, WeedError>;

impl WeedError {
    /// Stable numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::MemoryAllocation => 1,
            Self::NoSuchLeaf => 2,
            Self::NoSuchElement => 3,
            Self::WrongSeedType => 4,
            Self::Immutable => 5,
            Self::Undeletable => 6,
            Self::Concurrency => 7,
            Self::BadVersion(_) => 8,
            Self::Custom(code) => code,
        }
    }

    /// Map a numeric code back to an error.
    ///
    /// Returns `None` for [`WEED_SUCCESS`] and for codes that are neither
    /// core codes nor in the custom range.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::MemoryAllocation),
            2 => Some(Self::NoSuchLeaf),
            3 => Some(Self::NoSuchElement),
            4 => Some(Self::WrongSeedType),
            5 => Some(Self::Immutable),
            6 => Some(Self::Undeletable),
            7 => Some(Self::Concurrency),
            8 => Some(Self::BadVersion(0)),
            c if c >= WEED_ERROR_FIRST_CUSTOM => Some(Self::Custom(c)),
            _ => None,
        }
    }

    /// Whether the failed operation may succeed if simply retried.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Concurrency)
    }
}

/// Collapse a result into its stable status code.
#[must_use]
pub const fn status_code<T>(result: &WeedResult<T>) -> i32 {
    match result {
        Ok(_) => WEED_SUCCESS,
        Err(err) => err.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(WeedError::MemoryAllocation.code(), 1);
        assert_eq!(WeedError::NoSuchLeaf.code(), 2);
        assert_eq!(WeedError::NoSuchElement.code(), 3);
        assert_eq!(WeedError::WrongSeedType.code(), 4);
        assert_eq!(WeedError::Immutable.code(), 5);
        assert_eq!(WeedError::Undeletable.code(), 6);
        assert_eq!(WeedError::Concurrency.code(), 7);
        assert_eq!(WeedError::BadVersion(300).code(), 8);
        assert_eq!(WeedError::Custom(2000).code(), 2000);
    }

    #[test]
    fn from_code_round_trips_core_codes() {
        for code in 1..=7 {
            let err = WeedError::from_code(code).unwrap();
            assert_eq!(err.code(), code);
        }
        assert_eq!(WeedError::from_code(0), None);
        assert_eq!(WeedError::from_code(500), None);
        assert_eq!(WeedError::from_code(1024), Some(WeedError::Custom(1024)));
    }

    #[test]
    fn status_code_of_results() {
        let ok: WeedResult<()> = Ok(());
        let err: WeedResult<()> = Err(WeedError::Immutable);
        assert_eq!(status_code(&ok), WEED_SUCCESS);
        assert_eq!(status_code(&err), 5);
    }

    #[test]
    fn only_concurrency_is_transient() {
        assert!(WeedError::Concurrency.is_transient());
        assert!(!WeedError::Immutable.is_transient());
        assert!(!WeedError::NoSuchLeaf.is_transient());
    }
}
