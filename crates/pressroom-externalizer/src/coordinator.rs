//! Externalization coordinator
//!
//! Decides which versions a change affects, resolves each of them, persists
//! one artifact per resolved tree and retires the artifacts they replace.

use crate::merger::{ContentTypeMergers, MergerFactory};
use crate::resolver::{check_complete, TemporalResolver};
use crate::{ExternalizeError, ExternalizerConfig, TemporalReferenceTree};
use chrono::Utc;
use pressroom_domain::traits::{ArtifactStore, ContentSource, Rescheduler, VersionStore};
use pressroom_domain::{ArtifactId, ExternalFile, ValidationError, Version, VersionId};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Store capabilities the coordinator needs
pub trait ExternalizerStore: VersionStore + ContentSource + ArtifactStore {}

impl<T> ExternalizerStore for T where T: VersionStore + ContentSource + ArtifactStore {}

/// Per-run bookkeeping, dropped when the run ends
#[derive(Debug, Default)]
struct RunState {
    processing: HashSet<VersionId>,
    processed: HashSet<VersionId>,
}

impl RunState {
    fn begin(&mut self, id: VersionId) -> bool {
        if self.processing.contains(&id) || self.processed.contains(&id) {
            return false;
        }
        self.processing.insert(id)
    }

    fn finish(&mut self, id: VersionId) {
        self.processing.remove(&id);
        self.processed.insert(id);
    }
}

/// Synchronous externalization engine
///
/// Callers serialize access by holding `&mut self`; the async service keeps
/// the engine behind a single mutex.
pub struct Externalizer<S> {
    store: Arc<S>,
    mergers: Arc<dyn MergerFactory>,
    rescheduler: Option<Arc<dyn Rescheduler>>,
    config: ExternalizerConfig,
    walks: u64,
}

impl<S> Externalizer<S>
where
    S: ExternalizerStore,
{
    /// Create an engine with the content-type merger factory and no rescheduler
    pub fn new(store: Arc<S>, config: ExternalizerConfig) -> Self {
        Self {
            store,
            mergers: Arc::new(ContentTypeMergers),
            rescheduler: None,
            config,
            walks: 0,
        }
    }

    /// Use a different merger factory
    pub fn with_mergers(mut self, mergers: Arc<dyn MergerFactory>) -> Self {
        self.mergers = mergers;
        self
    }

    /// Notify `rescheduler` after every run
    pub fn with_rescheduler(mut self, rescheduler: Arc<dyn Rescheduler>) -> Self {
        self.rescheduler = Some(rescheduler);
        self
    }

    /// The engine configuration
    pub fn config(&self) -> &ExternalizerConfig {
        &self.config
    }

    /// The backing store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Number of resolver walks performed so far
    pub fn walk_count(&self) -> u64 {
        self.walks
    }

    /// Externalize the version stored under `id`
    pub fn externalize_by_id(&mut self, id: VersionId) -> Result<Vec<ExternalFile>, ExternalizeError> {
        let version = self
            .store
            .get_version(id)
            .map_err(ExternalizeError::store)?
            .ok_or_else(|| ValidationError::VersionNotFound(id.to_string()))?;
        self.externalize(&version)
    }

    /// Re-externalize `version` and every complete version composing it
    ///
    /// Returns the artifacts now backing the affected versions, sorted by
    /// interval start. If `version` itself fails the error is returned;
    /// failures of dependent versions are logged and skipped.
    pub fn externalize(&mut self, version: &Version) -> Result<Vec<ExternalFile>, ExternalizeError> {
        tracing::info!(version_id = %version.id, item = %version.item, "Starting externalization");

        let affected = self.collect_affected(version)?;
        let mut run = RunState::default();
        let mut files = Vec::new();
        let mut root_error = None;

        if version.is_deleted() {
            let retired = self.supersede(version.id, &HashSet::new())?;
            tracing::info!(version_id = %version.id, retired, "Retired artifacts of deleted version");
        }

        for candidate in &affected {
            if !run.begin(candidate.id) {
                tracing::debug!(version_id = %candidate.id, "Already externalized in this run");
                continue;
            }
            let outcome = self.externalize_one(candidate);
            run.finish(candidate.id);

            match outcome {
                Ok(mut produced) => files.append(&mut produced),
                Err(e) if candidate.id == version.id => {
                    tracing::error!(version_id = %candidate.id, "Externalization failed: {}", e);
                    root_error = Some(e);
                }
                Err(e) => {
                    tracing::error!(
                        version_id = %candidate.id,
                        changed = %version.id,
                        "Dependent externalization failed: {}",
                        e
                    );
                }
            }
        }

        files.sort_by(|a, b| {
            a.interval
                .from()
                .cmp(&b.interval.from())
                .then_with(|| a.item.cmp(&b.item))
        });

        if let Some(rescheduler) = &self.rescheduler {
            rescheduler.reschedule();
        }

        if let Some(e) = root_error {
            return Err(e);
        }
        tracing::info!(
            version_id = %version.id,
            versions = run.processed.len(),
            artifacts = files.len(),
            "Externalization complete"
        );
        Ok(files)
    }

    /// The changed version (when it qualifies) followed by its transitive
    /// composers, each listed once
    fn collect_affected(&self, version: &Version) -> Result<Vec<Version>, ExternalizeError> {
        let mut affected = Vec::new();
        let mut seen = HashSet::from([version.id]);

        if !version.is_deleted() && (version.has_composition() || self.config.publish_standalone) {
            affected.push(version.clone());
        }

        let mut frontier = VecDeque::from([(version.item.clone(), version.interval)]);
        while let Some((item, interval)) = frontier.pop_front() {
            let composers = self
                .store
                .find_composing_versions(&item, &interval)
                .map_err(ExternalizeError::store)?;
            for composer in composers {
                if composer.is_deleted() || !seen.insert(composer.id) {
                    continue;
                }
                let narrowed = composer.interval.intersection(&interval).unwrap_or(composer.interval);
                frontier.push_back((composer.item.clone(), narrowed));
                affected.push(composer);
            }
        }

        tracing::debug!(
            version_id = %version.id,
            affected = affected.len(),
            "Collected affected versions"
        );
        Ok(affected)
    }

    fn externalize_one(&mut self, version: &Version) -> Result<Vec<ExternalFile>, ExternalizeError> {
        match check_complete(self.store.as_ref(), version) {
            Ok(()) => {}
            Err(ExternalizeError::Validation(e)) => {
                tracing::info!(version_id = %version.id, "Skipping incomplete version: {}", e);
                self.supersede(version.id, &HashSet::new())?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        }

        self.walks += 1;
        let resolver = TemporalResolver::new(self.store.as_ref(), self.config.max_depth);
        let trees = resolver
            .resolve(version, self.mergers.as_ref())
            .map_err(|source| ExternalizeError::Externalization {
                version: version.id,
                source,
            })?;

        let previous = self
            .store
            .find_artifacts_by_source(version.id)
            .map_err(ExternalizeError::store)?;

        let mut kept = HashSet::new();
        let mut reused = 0;
        let mut files = Vec::with_capacity(trees.len());
        for tree in &trees {
            if let Some(existing) = previous.iter().find(|a| same_rendering(a, version, tree)) {
                tracing::debug!(artifact_id = %existing.id, "Reusing unchanged artifact");
                kept.insert(existing.id);
                reused += 1;
                files.push(existing.clone());
                continue;
            }

            let file = ExternalFile {
                id: ArtifactId::new(),
                item: version.item.clone(),
                source_version: version.id,
                interval: tree.interval(),
                content: tree.result().content.clone(),
                identity: tree.result().identity.clone(),
                state: version.state,
                deleted: false,
                created_at: Utc::now(),
            };
            self.store
                .save_artifact(file.clone())
                .map_err(ExternalizeError::store)?;
            tracing::debug!(artifact_id = %file.id, interval = %file.interval, "Saved artifact");
            kept.insert(file.id);
            files.push(file);
        }

        let retired = self.supersede(version.id, &kept)?;
        tracing::info!(
            version_id = %version.id,
            trees = trees.len(),
            saved = files.len() - reused,
            reused,
            retired,
            "Externalized version"
        );
        Ok(files)
    }

    /// Delete live artifacts of `version` that are not in `keep`; returns how
    /// many were retired
    fn supersede(&self, version: VersionId, keep: &HashSet<ArtifactId>) -> Result<usize, ExternalizeError> {
        let current = self
            .store
            .find_artifacts_by_source(version)
            .map_err(ExternalizeError::store)?;
        let mut retired = 0;
        for artifact in current {
            if keep.contains(&artifact.id) {
                continue;
            }
            if self
                .store
                .delete_artifact(artifact.id)
                .map_err(ExternalizeError::store)?
            {
                retired += 1;
            }
        }
        Ok(retired)
    }
}

fn same_rendering(artifact: &ExternalFile, version: &Version, tree: &TemporalReferenceTree) -> bool {
    artifact.interval == tree.interval()
        && artifact.state == version.state
        && artifact.identity.is_some()
        && artifact.identity == tree.result().identity
}
