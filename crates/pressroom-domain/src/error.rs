//! Validation errors raised before any externalization work starts

use thiserror::Error;

/// Malformed input rejected at construction or before tree work begins
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Interval whose start is not strictly before its end
    #[error("Empty or inverted interval: {from} >= {to}")]
    EmptyInterval {
        /// Requested start
        from: String,
        /// Requested end
        to: String,
    },

    /// Item URI that cannot be mapped to a relative file-system path
    #[error("Invalid item URI '{uri}': {reason}")]
    InvalidItemUri {
        /// Offending URI
        uri: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// A composition reference has no overlapping target version
    #[error("Version {version} is incomplete: no valid version of '{missing}' overlaps its interval")]
    IncompleteVersion {
        /// Version being checked
        version: String,
        /// Item that could not be resolved
        missing: String,
    },

    /// Version id that the store does not know
    #[error("Version not found: {0}")]
    VersionNotFound(String),
}
