//! Error types for the Externalizer

use pressroom_domain::{ItemUri, ValidationError, VersionId};
use thiserror::Error;

/// Errors raised while resolving or merging one version's trees
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalizationError {
    /// The merger for this content type cannot absorb child content
    #[error("Content type '{content_type}' does not support composition (child '{item}')")]
    NotComposable {
        /// Content type of the root version
        content_type: String,
        /// Child item that was offered
        item: ItemUri,
    },

    /// The parent content has no placeholder for a composed child
    #[error("No composition placeholder for '{item}' in '{parent}'")]
    PlaceholderNotFound {
        /// Child item
        item: ItemUri,
        /// Parent item searched
        parent: ItemUri,
    },

    /// Content could not be parsed or spliced
    #[error("Malformed content in '{item}': {reason}")]
    MalformedContent {
        /// Item whose content is malformed
        item: ItemUri,
        /// Parser or structure message
        reason: String,
    },

    /// Content blob could not be read
    #[error("Failed to read content of '{item}': {reason}")]
    ContentRead {
        /// Item whose blob failed
        item: ItemUri,
        /// Source error
        reason: String,
    },

    /// An item composes itself through its ancestors
    #[error("Composition cycle through '{item}'")]
    CompositionCycle {
        /// Item that reappeared on the ancestor path
        item: ItemUri,
    },

    /// Composition nesting is deeper than allowed
    #[error("Composition depth exceeds {max_depth}")]
    DepthExceeded {
        /// Configured limit
        max_depth: usize,
    },

    /// A merger asked for content outside of a visit
    #[error("No content in scope")]
    NoContentInScope,

    /// A merger finished without having seen a root
    #[error("Merger finished without a root node")]
    EmptyTree,

    /// Version store error
    #[error("Store error: {0}")]
    Store(String),
}

/// Errors surfaced to callers of the coordinator
#[derive(Error, Debug, Clone)]
pub enum ExternalizeError {
    /// Input rejected before any tree work
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resolving or merging the requested version failed
    #[error("Externalization of {version} failed: {source}")]
    Externalization {
        /// Version that failed
        version: VersionId,
        /// Underlying failure
        #[source]
        source: ExternalizationError,
    },

    /// Store error
    #[error("Store error: {0}")]
    Store(String),

    /// The walk panicked; the next request runs on a recovered engine
    #[error("Externalizer engine unavailable")]
    EngineUnavailable,

    /// The background worker is gone
    #[error("Externalizer worker stopped")]
    WorkerStopped,
}

impl ExternalizeError {
    pub(crate) fn store(e: impl std::fmt::Display) -> Self {
        ExternalizeError::Store(e.to_string())
    }
}
