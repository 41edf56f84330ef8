//! Destination reconciliation
//!
//! Brings one destination's file tree in line with the artifacts visible at
//! an instant: stale files are deleted, desired files are written, empty
//! directories are pruned. Running it twice with the same input changes
//! nothing the second time.
//!
//! Every per-file failure is collected in the report and the pass goes on
//! with the next file.

use crate::ReconciliationError;
use pressroom_domain::{Destination, ExternalFile, LifecycleState};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const TEMP_SUFFIX: &str = ".pressroom-tmp";

/// Options shared by every destination in a tick
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Only report what would change
    pub dry_run: bool,
    /// Remove directories left empty
    pub prune_empty_dirs: bool,
}

/// Outcome of reconciling one destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationReport {
    /// Files written (new or changed content)
    pub written: usize,
    /// Desired files already identical on disk
    pub unchanged: usize,
    /// Stale files removed
    pub deleted: usize,
    /// Empty directories removed
    pub pruned: usize,
    /// Artifacts skipped because their item has no valid path
    pub skipped: usize,
    /// Per-file failures, in the order they happened
    pub failures: Vec<ReconciliationError>,
}

/// Reconcile `destination` against `artifacts`
///
/// Only artifacts the destination accepts and whose state is `Active` are
/// published. When two artifacts map to the same path the most recently
/// created one wins.
pub fn reconcile(
    destination: &Destination,
    artifacts: &[ExternalFile],
    options: ReconcileOptions,
) -> DestinationReport {
    let mut report = DestinationReport::default();
    let desired = desired_files(destination, artifacts, &mut report);
    let root = &destination.root;

    if !root.exists() && !options.dry_run {
        if let Err(e) = fs::create_dir_all(root) {
            report.failures.push(ReconciliationError::walk(root, e));
            return report;
        }
    }

    let mut existing = BTreeSet::new();
    let mut dirs = Vec::new();
    if root.exists() {
        walk(root, Path::new(""), &mut existing, &mut dirs, &mut report.failures);
    }

    for relative in existing.iter().filter(|p| !desired.contains_key(*p)) {
        let path = root.join(relative);
        if options.dry_run {
            tracing::info!(destination = %destination.name, path = %path.display(), "Would delete");
            report.deleted += 1;
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(destination = %destination.name, path = %path.display(), "Deleted stale file");
                report.deleted += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(destination = %destination.name, path = %path.display(), "Delete failed: {}", e);
                report.failures.push(ReconciliationError::delete(path, e));
            }
        }
    }

    for (relative, artifact) in &desired {
        let path = root.join(relative);
        if fs::read(&path).is_ok_and(|current| current == artifact.content) {
            report.unchanged += 1;
            continue;
        }
        if options.dry_run {
            tracing::info!(destination = %destination.name, path = %path.display(), "Would write");
            report.written += 1;
            continue;
        }
        match write_atomically(&path, &artifact.content) {
            Ok(()) => {
                tracing::debug!(
                    destination = %destination.name,
                    path = %path.display(),
                    artifact_id = %artifact.id,
                    "Wrote file"
                );
                report.written += 1;
            }
            Err(e) => {
                tracing::warn!(destination = %destination.name, path = %path.display(), "Write failed: {}", e);
                report.failures.push(ReconciliationError::write(path, e));
            }
        }
    }

    if options.prune_empty_dirs && !options.dry_run {
        // Deepest first so parents emptied by their children go too
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        for dir in dirs {
            let path = root.join(&dir);
            if is_empty_dir(&path) {
                match fs::remove_dir(&path) {
                    Ok(()) => report.pruned += 1,
                    Err(e) => report.failures.push(ReconciliationError::delete(path, e)),
                }
            }
        }
    }

    tracing::info!(
        destination = %destination.name,
        written = report.written,
        unchanged = report.unchanged,
        deleted = report.deleted,
        pruned = report.pruned,
        failures = report.failures.len(),
        "Reconciled destination"
    );
    report
}

/// Relative path to artifact for every file the destination should hold
fn desired_files<'a>(
    destination: &Destination,
    artifacts: &'a [ExternalFile],
    report: &mut DestinationReport,
) -> BTreeMap<PathBuf, &'a ExternalFile> {
    let mut desired: BTreeMap<PathBuf, &ExternalFile> = BTreeMap::new();
    for artifact in artifacts {
        if artifact.deleted
            || artifact.state != LifecycleState::Active
            || !destination.accepts(&artifact.item)
        {
            continue;
        }
        let relative = match artifact.item.to_relative_path() {
            Ok(relative) => relative,
            Err(e) => {
                tracing::warn!(destination = %destination.name, "Skipping artifact {}: {}", artifact.id, e);
                report.skipped += 1;
                continue;
            }
        };
        match desired.get(&relative).copied() {
            Some(current) if newer(current, artifact) => {
                tracing::warn!(
                    destination = %destination.name,
                    path = %relative.display(),
                    kept = %current.id,
                    dropped = %artifact.id,
                    "Path collision"
                );
            }
            Some(current) => {
                tracing::warn!(
                    destination = %destination.name,
                    path = %relative.display(),
                    kept = %artifact.id,
                    dropped = %current.id,
                    "Path collision"
                );
                desired.insert(relative, artifact);
            }
            None => {
                desired.insert(relative, artifact);
            }
        }
    }
    desired
}

fn newer(a: &ExternalFile, b: &ExternalFile) -> bool {
    (a.created_at, a.id) > (b.created_at, b.id)
}

/// Collect files and directories under `root`, relative to it
fn walk(
    root: &Path,
    relative: &Path,
    files: &mut BTreeSet<PathBuf>,
    dirs: &mut Vec<PathBuf>,
    failures: &mut Vec<ReconciliationError>,
) {
    let dir = root.join(relative);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            failures.push(ReconciliationError::walk(dir, e));
            return;
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                failures.push(ReconciliationError::walk(&dir, e));
                continue;
            }
        };
        let child = relative.join(entry.file_name());
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => {
                dirs.push(child.clone());
                walk(root, &child, files, dirs, failures);
            }
            Ok(_) => {
                files.insert(child);
            }
            Err(e) => failures.push(ReconciliationError::walk(entry.path(), e)),
        }
    }
}

/// Write `content` to a sibling temp file, then rename it over `path`
fn write_atomically(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut temp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    temp_name.push(TEMP_SUFFIX);
    let temp = path.with_file_name(temp_name);

    fs::write(&temp, content)?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(())
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pressroom_domain::{ArtifactId, Interval, ItemUri, VersionId};

    fn artifact(item: &str, content: &str, age: i64) -> ExternalFile {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ExternalFile {
            id: ArtifactId::new(),
            item: ItemUri::new(item),
            source_version: VersionId::new(),
            interval: Interval::starting_at(t),
            content: content.as_bytes().to_vec(),
            identity: None,
            state: LifecycleState::Active,
            deleted: false,
            created_at: t - Duration::hours(age),
        }
    }

    #[test]
    fn test_desired_files_filters_and_resolves_collisions() {
        let mut dest = Destination::new("web", "/unused");
        dest.prefixes = vec!["public/".to_string()];

        let draft = ExternalFile {
            state: LifecycleState::Draft,
            ..artifact("public/draft.json", "d", 0)
        };
        let older = artifact("public/page.json", "old", 5);
        let newer = artifact("public/page.json", "new", 1);
        let artifacts = vec![
            newer.clone(),
            older,
            draft,
            artifact("private/notes.json", "n", 0),
            artifact("public/../escape", "x", 0),
        ];

        let mut report = DestinationReport::default();
        let desired = desired_files(&dest, &artifacts, &mut report);
        assert_eq!(desired.len(), 1);
        assert_eq!(desired[Path::new("public/page.json")].id, newer.id);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_write_atomically_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/page.json");
        write_atomically(&path, b"hello").unwrap();
        write_atomically(&path, b"again").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"again");
        let names: Vec<_> = fs::read_dir(dir.path().join("a/b"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("page.json")]);
    }
}
