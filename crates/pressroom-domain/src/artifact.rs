//! Finished artifacts (external files)

use crate::{Instant, Interval, ItemUri, LifecycleState, VersionId};
use std::fmt;

/// Unique identifier for an artifact based on UUIDv7
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactId(u128);

impl ArtifactId {
    /// Generate a new UUIDv7-based ArtifactId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an ArtifactId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// A finished, time-bounded rendering of an item ready to publish
///
/// Artifacts are never mutated in place: a changed interval or content
/// produces a new artifact, and the old one is marked deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalFile {
    /// Unique identifier
    pub id: ArtifactId,

    /// Item this artifact renders
    pub item: ItemUri,

    /// Root version the artifact was resolved from
    pub source_version: VersionId,

    /// Validity interval (the resolved tree's pinned interval)
    pub interval: Interval,

    /// Finished content bytes
    pub content: Vec<u8>,

    /// Identity of the composed version combination, if the merger produced one
    pub identity: Option<String>,

    /// Lifecycle state copied from the source version
    pub state: LifecycleState,

    /// Removed from publication
    pub deleted: bool,

    /// When this artifact was created
    pub created_at: Instant,
}

impl ExternalFile {
    /// True if the artifact is live and publishable at `t`
    pub fn is_published_at(&self, t: Instant) -> bool {
        !self.deleted && self.state == LifecycleState::Active && self.interval.contains(t)
    }
}
