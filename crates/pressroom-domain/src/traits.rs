//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the engine and its
//! collaborators. The item/version store, the artifact store, the content
//! blob source and the destination registry are external; reference
//! implementations live in `pressroom-store`.
//!
//! All methods take `&self`: implementations are shared between the
//! externalizer worker and the publish scheduler and synchronise internally.

use crate::{
    ArtifactId, ContentRef, Destination, ExternalFile, Instant, Interval, ItemUri, Version,
    VersionId,
};
use std::convert::Infallible;

/// Read access to items and their versions
///
/// Implemented by the infrastructure layer (pressroom-store)
pub trait VersionStore: Send + Sync {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get a version by ID
    fn get_version(&self, id: VersionId) -> Result<Option<Version>, Self::Error>;

    /// Non-deleted versions of `item` whose interval overlaps `interval`,
    /// ordered by ascending sequence
    fn find_versions(&self, item: &ItemUri, interval: &Interval)
        -> Result<Vec<Version>, Self::Error>;

    /// Non-deleted versions holding a composition reference to `item` whose
    /// interval overlaps `interval`
    fn find_composing_versions(
        &self,
        item: &ItemUri,
        interval: &Interval,
    ) -> Result<Vec<Version>, Self::Error>;
}

/// Raw content blobs referenced by versions
pub trait ContentSource: Send + Sync {
    /// Error type for content reads
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the blob behind `content`
    fn read_content(&self, content: &ContentRef) -> Result<Vec<u8>, Self::Error>;
}

/// Persistence for finished artifacts
pub trait ArtifactStore: Send + Sync {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a new artifact
    fn save_artifact(&self, artifact: ExternalFile) -> Result<ArtifactId, Self::Error>;

    /// Get an artifact by ID (deleted artifacts included)
    fn get_artifact(&self, id: ArtifactId) -> Result<Option<ExternalFile>, Self::Error>;

    /// Mark an artifact deleted; returns false if it was unknown or already deleted
    fn delete_artifact(&self, id: ArtifactId) -> Result<bool, Self::Error>;

    /// Non-deleted artifacts whose interval contains `at`
    fn find_artifacts_at(&self, at: Instant) -> Result<Vec<ExternalFile>, Self::Error>;

    /// Non-deleted artifacts whose interval overlaps `interval`
    fn find_artifacts(&self, interval: &Interval) -> Result<Vec<ExternalFile>, Self::Error>;

    /// Non-deleted artifacts resolved from `version`
    fn find_artifacts_by_source(&self, version: VersionId)
        -> Result<Vec<ExternalFile>, Self::Error>;

    /// Every non-deleted artifact
    fn list_artifacts(&self) -> Result<Vec<ExternalFile>, Self::Error>;
}

/// Source of publish destinations
pub trait DestinationRegistry: Send + Sync {
    /// Error type for registry lookups
    type Error: std::error::Error + Send + Sync + 'static;

    /// All configured destinations
    fn list_destinations(&self) -> Result<Vec<Destination>, Self::Error>;
}

/// A fixed list of destinations is its own registry
impl DestinationRegistry for Vec<Destination> {
    type Error = Infallible;

    fn list_destinations(&self) -> Result<Vec<Destination>, Self::Error> {
        Ok(self.clone())
    }
}

/// Something that re-derives the publish timetable after artifacts change
///
/// Implemented by the publish scheduler (pressroom-publisher)
pub trait Rescheduler: Send + Sync {
    /// Recompute the timetable from the artifact store
    fn reschedule(&self);
}
