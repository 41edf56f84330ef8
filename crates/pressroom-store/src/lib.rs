//! Pressroom Storage Layer
//!
//! Reference implementations of the version, content and artifact store
//! traits from `pressroom_domain::traits`.
//!
//! # Architecture
//!
//! - [`SqliteStore`]: SQLite-backed store for the daemon (versions, reference
//!   lists, content blobs and artifacts in one database file)
//! - [`MemoryStore`]: in-process store for tests and demos
//!
//! # Examples
//!
//! ```no_run
//! use pressroom_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for version and artifact operations
//! ```

#![warn(missing_docs)]

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use pressroom_domain::traits::{ArtifactStore, ContentSource, VersionStore};
use pressroom_domain::{
    ArtifactId, ContentRef, ExternalFile, Instant, Interval, IntervalEnd, ItemUri, LifecycleState,
    Reference, ReferenceKind, Version, VersionId,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Duplicate record detected
    #[error("Duplicate record detected")]
    Duplicate,

    /// A thread panicked while holding the store lock
    #[error("Store lock poisoned")]
    Poisoned,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS versions (
    id BLOB PRIMARY KEY,
    item_uri TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    valid_from INTEGER NOT NULL,
    valid_to INTEGER,
    content_type TEXT NOT NULL,
    content_ref TEXT NOT NULL,
    state TEXT NOT NULL,
    approver TEXT,
    metadata TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_versions_item ON versions(item_uri, sequence);

CREATE TABLE IF NOT EXISTS version_references (
    version_id BLOB NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    target_uri TEXT NOT NULL,
    kind TEXT NOT NULL,
    PRIMARY KEY (version_id, position)
);
CREATE INDEX IF NOT EXISTS idx_references_target ON version_references(target_uri, kind);

CREATE TABLE IF NOT EXISTS blobs (
    key TEXT PRIMARY KEY,
    bytes BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS artifacts (
    id BLOB PRIMARY KEY,
    item_uri TEXT NOT NULL,
    source_version BLOB NOT NULL,
    valid_from INTEGER NOT NULL,
    valid_to INTEGER,
    content BLOB NOT NULL,
    identity TEXT,
    state TEXT NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_artifacts_live ON artifacts(deleted, valid_from);
CREATE INDEX IF NOT EXISTS idx_artifacts_source ON artifacts(source_version);
"#;

const VERSION_COLUMNS: &str =
    "id, item_uri, sequence, valid_from, valid_to, content_type, content_ref, state, approver, metadata";

const ARTIFACT_COLUMNS: &str =
    "id, item_uri, source_version, valid_from, valid_to, content, identity, state, deleted, created_at";

/// SQLite-based implementation of the store traits
///
/// The connection sits behind a mutex so the store can be shared between
/// the externalizer worker and the publish scheduler.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Store a content blob under `key`, replacing any previous blob
    pub fn put_content(&self, key: &str, bytes: &[u8]) -> Result<ContentRef, StoreError> {
        self.conn()?.execute(
            "INSERT INTO blobs (key, bytes) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET bytes = excluded.bytes",
            params![key, bytes],
        )?;
        Ok(ContentRef::new(key))
    }

    /// Insert a version together with its reference list
    pub fn insert_version(&self, version: &Version) -> Result<VersionId, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let id_bytes = id_to_bytes(version.id.value());

        let exists: bool = tx
            .query_row("SELECT 1 FROM versions WHERE id = ?1", params![&id_bytes], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if exists {
            return Err(StoreError::Duplicate);
        }

        let metadata = serde_json::to_string(&version.metadata)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        tx.execute(
            "INSERT INTO versions (id, item_uri, sequence, valid_from, valid_to, content_type, content_ref, state, approver, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &id_bytes,
                version.item.as_str(),
                version.sequence as i64,
                instant_to_nanos(version.interval.from())?,
                end_to_nanos(version.interval.to())?,
                &version.content_type,
                version.content.as_str(),
                version.state.as_str(),
                &version.approver,
                metadata,
            ],
        )?;
        for (position, reference) in version.references.iter().enumerate() {
            tx.execute(
                "INSERT INTO version_references (version_id, position, target_uri, kind)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    &id_bytes,
                    position as i64,
                    reference.target.as_str(),
                    reference.kind.as_str()
                ],
            )?;
        }
        tx.commit()?;
        Ok(version.id)
    }

    /// Change a version's lifecycle state
    pub fn set_version_state(&self, id: VersionId, state: LifecycleState) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE versions SET state = ?1 WHERE id = ?2",
            params![state.as_str(), id_to_bytes(id.value())],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Run a version query and attach each version's references
    fn query_versions(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Version>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let mut versions = stmt
            .query_map(params, row_to_version)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut refs = conn.prepare(
            "SELECT target_uri, kind FROM version_references WHERE version_id = ?1 ORDER BY position",
        )?;
        for version in &mut versions {
            version.references = refs
                .query_map(params![id_to_bytes(version.id.value())], |row| {
                    let target: String = row.get(0)?;
                    let kind: String = row.get(1)?;
                    let kind = ReferenceKind::parse(&kind).ok_or_else(|| {
                        conversion_error(1, StoreError::InvalidData(format!("Unknown reference kind: {}", kind)))
                    })?;
                    Ok(Reference {
                        target: ItemUri::new(target),
                        kind,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
        }
        Ok(versions)
    }

    fn query_artifacts(
        &self,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<ExternalFile>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM artifacts WHERE deleted = 0 AND {} ORDER BY valid_from, created_at",
            ARTIFACT_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let artifacts = stmt
            .query_map(params, row_to_artifact)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artifacts)
    }
}

impl VersionStore for SqliteStore {
    type Error = StoreError;

    fn get_version(&self, id: VersionId) -> Result<Option<Version>, Self::Error> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM versions WHERE id = ?1", VERSION_COLUMNS);
        let id_bytes = id_to_bytes(id.value());
        Ok(Self::query_versions(&conn, &sql, params![id_bytes])?.into_iter().next())
    }

    fn find_versions(
        &self,
        item: &ItemUri,
        interval: &Interval,
    ) -> Result<Vec<Version>, Self::Error> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM versions
             WHERE item_uri = ?1 AND state != 'deleted'
               AND valid_from < ?2 AND (valid_to IS NULL OR valid_to > ?3)
             ORDER BY sequence, id",
            VERSION_COLUMNS
        );
        let upper = end_to_nanos(interval.to())?.unwrap_or(i64::MAX);
        let lower = instant_to_nanos(interval.from())?;
        Self::query_versions(&conn, &sql, params![item.as_str(), upper, lower])
    }

    fn find_composing_versions(
        &self,
        item: &ItemUri,
        interval: &Interval,
    ) -> Result<Vec<Version>, Self::Error> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM versions
             WHERE state != 'deleted'
               AND valid_from < ?2 AND (valid_to IS NULL OR valid_to > ?3)
               AND id IN (SELECT version_id FROM version_references
                          WHERE target_uri = ?1 AND kind = 'composition')
             ORDER BY sequence, id",
            VERSION_COLUMNS
        );
        let upper = end_to_nanos(interval.to())?.unwrap_or(i64::MAX);
        let lower = instant_to_nanos(interval.from())?;
        Self::query_versions(&conn, &sql, params![item.as_str(), upper, lower])
    }
}

impl ContentSource for SqliteStore {
    type Error = StoreError;

    fn read_content(&self, content: &ContentRef) -> Result<Vec<u8>, Self::Error> {
        self.conn()?
            .query_row(
                "SELECT bytes FROM blobs WHERE key = ?1",
                params![content.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("content blob '{}'", content)))
    }
}

impl ArtifactStore for SqliteStore {
    type Error = StoreError;

    fn save_artifact(&self, artifact: ExternalFile) -> Result<ArtifactId, Self::Error> {
        let conn = self.conn()?;
        let id_bytes = id_to_bytes(artifact.id.value());
        let exists: bool = conn
            .query_row("SELECT 1 FROM artifacts WHERE id = ?1", params![&id_bytes], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if exists {
            return Err(StoreError::Duplicate);
        }

        conn.execute(
            "INSERT INTO artifacts (id, item_uri, source_version, valid_from, valid_to, content, identity, state, deleted, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &id_bytes,
                artifact.item.as_str(),
                id_to_bytes(artifact.source_version.value()),
                instant_to_nanos(artifact.interval.from())?,
                end_to_nanos(artifact.interval.to())?,
                &artifact.content,
                &artifact.identity,
                artifact.state.as_str(),
                artifact.deleted,
                instant_to_nanos(artifact.created_at)?,
            ],
        )?;
        Ok(artifact.id)
    }

    fn get_artifact(&self, id: ArtifactId) -> Result<Option<ExternalFile>, Self::Error> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM artifacts WHERE id = ?1", ARTIFACT_COLUMNS);
        let artifact = conn
            .query_row(&sql, params![id_to_bytes(id.value())], row_to_artifact)
            .optional()?;
        Ok(artifact)
    }

    fn delete_artifact(&self, id: ArtifactId) -> Result<bool, Self::Error> {
        let changed = self.conn()?.execute(
            "UPDATE artifacts SET deleted = 1 WHERE id = ?1 AND deleted = 0",
            params![id_to_bytes(id.value())],
        )?;
        Ok(changed > 0)
    }

    fn find_artifacts_at(&self, at: Instant) -> Result<Vec<ExternalFile>, Self::Error> {
        let at = instant_to_nanos(at)?;
        self.query_artifacts("valid_from <= ?1 AND (valid_to IS NULL OR valid_to > ?1)", params![at])
    }

    fn find_artifacts(&self, interval: &Interval) -> Result<Vec<ExternalFile>, Self::Error> {
        let upper = end_to_nanos(interval.to())?.unwrap_or(i64::MAX);
        let lower = instant_to_nanos(interval.from())?;
        self.query_artifacts(
            "valid_from < ?1 AND (valid_to IS NULL OR valid_to > ?2)",
            params![upper, lower],
        )
    }

    fn find_artifacts_by_source(
        &self,
        version: VersionId,
    ) -> Result<Vec<ExternalFile>, Self::Error> {
        let id_bytes = id_to_bytes(version.value());
        self.query_artifacts("source_version = ?1", params![id_bytes])
    }

    fn list_artifacts(&self) -> Result<Vec<ExternalFile>, Self::Error> {
        self.query_artifacts("1=1", params![])
    }
}

/// Convert an id to bytes for storage
fn id_to_bytes(value: u128) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Convert stored bytes back to an id value
fn bytes_to_id(bytes: &[u8]) -> Result<u128, StoreError> {
    if bytes.len() != 16 {
        return Err(StoreError::InvalidData(format!(
            "Expected 16 bytes for id, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 16];
    arr.copy_from_slice(bytes);
    Ok(u128::from_be_bytes(arr))
}

/// Instants are stored as nanoseconds since the epoch
fn instant_to_nanos(at: Instant) -> Result<i64, StoreError> {
    at.timestamp_nanos_opt()
        .ok_or_else(|| StoreError::InvalidData(format!("Instant out of storable range: {}", at)))
}

fn end_to_nanos(end: IntervalEnd) -> Result<Option<i64>, StoreError> {
    end.instant().map(instant_to_nanos).transpose()
}

fn conversion_error(column: usize, e: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Blob, Box::new(e))
}

fn nanos_to_instant(nanos: i64) -> Instant {
    DateTime::<Utc>::from_timestamp_nanos(nanos)
}

fn interval_from_row(row: &Row<'_>, from_col: usize, to_col: usize) -> rusqlite::Result<Interval> {
    let from = nanos_to_instant(row.get(from_col)?);
    let to: Option<i64> = row.get(to_col)?;
    let to = match to {
        Some(nanos) => IntervalEnd::Finite(nanos_to_instant(nanos)),
        None => IntervalEnd::Infinite,
    };
    Interval::new(from, to)
        .map_err(|e| conversion_error(from_col, StoreError::InvalidData(e.to_string())))
}

fn state_from_row(row: &Row<'_>, col: usize) -> rusqlite::Result<LifecycleState> {
    let state: String = row.get(col)?;
    LifecycleState::parse(&state).ok_or_else(|| {
        conversion_error(col, StoreError::InvalidData(format!("Unknown lifecycle state: {}", state)))
    })
}

fn id_from_row(row: &Row<'_>, col: usize) -> rusqlite::Result<u128> {
    let bytes: Vec<u8> = row.get(col)?;
    bytes_to_id(&bytes).map_err(|e| conversion_error(col, e))
}

fn row_to_version(row: &Row<'_>) -> rusqlite::Result<Version> {
    let metadata: String = row.get(9)?;
    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)
        .map_err(|e| conversion_error(9, StoreError::InvalidData(e.to_string())))?;

    Ok(Version {
        id: VersionId::from_value(id_from_row(row, 0)?),
        item: ItemUri::new(row.get::<_, String>(1)?),
        sequence: row.get::<_, i64>(2)? as u64,
        interval: interval_from_row(row, 3, 4)?,
        content_type: row.get(5)?,
        content: ContentRef::new(row.get::<_, String>(6)?),
        state: state_from_row(row, 7)?,
        approver: row.get(8)?,
        metadata,
        references: Vec::new(),
    })
}

fn row_to_artifact(row: &Row<'_>) -> rusqlite::Result<ExternalFile> {
    Ok(ExternalFile {
        id: ArtifactId::from_value(id_from_row(row, 0)?),
        item: ItemUri::new(row.get::<_, String>(1)?),
        source_version: VersionId::from_value(id_from_row(row, 2)?),
        interval: interval_from_row(row, 3, 4)?,
        content: row.get(5)?,
        identity: row.get(6)?,
        state: state_from_row(row, 7)?,
        deleted: row.get(8)?,
        created_at: nanos_to_instant(row.get(9)?),
    })
}
