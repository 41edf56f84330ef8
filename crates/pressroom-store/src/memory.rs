//! In-memory store, used by tests and single-process demos

use crate::StoreError;
use pressroom_domain::traits::{ArtifactStore, ContentSource, VersionStore};
use pressroom_domain::{
    ArtifactId, ContentRef, ExternalFile, Instant, Interval, ItemUri, LifecycleState, Version,
    VersionId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    versions: BTreeMap<VersionId, Version>,
    blobs: HashMap<String, Vec<u8>>,
    artifacts: BTreeMap<ArtifactId, ExternalFile>,
}

/// Store keeping versions, blobs and artifacts in process memory
///
/// # Examples
///
/// ```
/// use pressroom_store::MemoryStore;
///
/// let store = MemoryStore::new();
/// let blob = store.put_content("intro", b"hello".to_vec()).unwrap();
/// assert_eq!(blob.as_str(), "intro");
/// ```
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }

    /// Store a content blob under `key`, replacing any previous blob
    pub fn put_content(
        &self,
        key: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<ContentRef, StoreError> {
        let key = key.into();
        self.write()?.blobs.insert(key.clone(), bytes);
        Ok(ContentRef::new(key))
    }

    /// Insert or replace a version
    pub fn insert_version(&self, version: Version) -> Result<VersionId, StoreError> {
        let id = version.id;
        self.write()?.versions.insert(id, version);
        Ok(id)
    }

    /// Change a version's lifecycle state
    pub fn set_version_state(&self, id: VersionId, state: LifecycleState) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let version = inner
            .versions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        version.state = state;
        Ok(())
    }

    /// Number of artifacts ever saved, deleted ones included
    pub fn artifact_count(&self) -> usize {
        self.inner.read().map(|i| i.artifacts.len()).unwrap_or(0)
    }

    fn sorted_by_sequence(mut versions: Vec<Version>) -> Vec<Version> {
        versions.sort_by_key(|v| (v.sequence, v.id));
        versions
    }

    fn live_artifacts<F>(&self, keep: F) -> Result<Vec<ExternalFile>, StoreError>
    where
        F: Fn(&ExternalFile) -> bool,
    {
        Ok(self
            .read()?
            .artifacts
            .values()
            .filter(|a| !a.deleted && keep(a))
            .cloned()
            .collect())
    }
}

impl VersionStore for MemoryStore {
    type Error = StoreError;

    fn get_version(&self, id: VersionId) -> Result<Option<Version>, Self::Error> {
        Ok(self.read()?.versions.get(&id).cloned())
    }

    fn find_versions(
        &self,
        item: &ItemUri,
        interval: &Interval,
    ) -> Result<Vec<Version>, Self::Error> {
        let matches = self
            .read()?
            .versions
            .values()
            .filter(|v| &v.item == item && !v.is_deleted() && v.interval.overlaps(interval))
            .cloned()
            .collect();
        Ok(Self::sorted_by_sequence(matches))
    }

    fn find_composing_versions(
        &self,
        item: &ItemUri,
        interval: &Interval,
    ) -> Result<Vec<Version>, Self::Error> {
        let matches = self
            .read()?
            .versions
            .values()
            .filter(|v| v.composes(item) && !v.is_deleted() && v.interval.overlaps(interval))
            .cloned()
            .collect();
        Ok(Self::sorted_by_sequence(matches))
    }
}

impl ContentSource for MemoryStore {
    type Error = StoreError;

    fn read_content(&self, content: &ContentRef) -> Result<Vec<u8>, Self::Error> {
        self.read()?
            .blobs
            .get(content.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("content blob '{}'", content)))
    }
}

impl ArtifactStore for MemoryStore {
    type Error = StoreError;

    fn save_artifact(&self, artifact: ExternalFile) -> Result<ArtifactId, Self::Error> {
        let mut inner = self.write()?;
        if inner.artifacts.contains_key(&artifact.id) {
            return Err(StoreError::Duplicate);
        }
        let id = artifact.id;
        inner.artifacts.insert(id, artifact);
        Ok(id)
    }

    fn get_artifact(&self, id: ArtifactId) -> Result<Option<ExternalFile>, Self::Error> {
        Ok(self.read()?.artifacts.get(&id).cloned())
    }

    fn delete_artifact(&self, id: ArtifactId) -> Result<bool, Self::Error> {
        let mut inner = self.write()?;
        match inner.artifacts.get_mut(&id) {
            Some(a) if !a.deleted => {
                a.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn find_artifacts_at(&self, at: Instant) -> Result<Vec<ExternalFile>, Self::Error> {
        self.live_artifacts(|a| a.interval.contains(at))
    }

    fn find_artifacts(&self, interval: &Interval) -> Result<Vec<ExternalFile>, Self::Error> {
        self.live_artifacts(|a| a.interval.overlaps(interval))
    }

    fn find_artifacts_by_source(
        &self,
        version: VersionId,
    ) -> Result<Vec<ExternalFile>, Self::Error> {
        self.live_artifacts(|a| a.source_version == version)
    }

    fn list_artifacts(&self) -> Result<Vec<ExternalFile>, Self::Error> {
        self.live_artifacts(|_| true)
    }
}
