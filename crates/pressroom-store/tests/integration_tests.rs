//! Integration tests for pressroom-store
//!
//! The same scenarios run against both store implementations.

use chrono::{Duration, TimeZone, Utc};
use pressroom_domain::traits::{ArtifactStore, ContentSource, VersionStore};
use pressroom_domain::{
    ArtifactId, ContentRef, ExternalFile, Instant, Interval, ItemUri, LifecycleState, Reference,
    Version,
};
use pressroom_store::{MemoryStore, SqliteStore};

fn t(days: i64) -> Instant {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(days)
}

fn version(item: &str, sequence: u64, interval: Interval) -> Version {
    Version::new(item, sequence, interval, "text/plain", ContentRef::new(format!("{item}-{sequence}")))
}

fn artifact(item: &str, source: &Version, interval: Interval) -> ExternalFile {
    ExternalFile {
        id: ArtifactId::new(),
        item: ItemUri::new(item),
        source_version: source.id,
        interval,
        content: b"rendered".to_vec(),
        identity: Some("abc".to_string()),
        state: LifecycleState::Active,
        deleted: false,
        created_at: t(0),
    }
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_sqlite_version_roundtrip_keeps_references_in_order() {
    let store = SqliteStore::new(":memory:").unwrap();

    let mut v = version("root.json", 1, Interval::bounded(t(0), t(100)).unwrap())
        .with_reference(Reference::composition("a.json"))
        .with_reference(Reference::link("b.json"))
        .with_reference(Reference::composition("c.json"));
    v.approver = Some("editor".to_string());
    v.metadata.insert("lang".to_string(), "en".to_string());
    store.insert_version(&v).unwrap();

    let loaded = store.get_version(v.id).unwrap().expect("version should exist");
    assert_eq!(loaded, v);
}

#[test]
fn test_sqlite_keeps_sub_millisecond_bounds() {
    let store = SqliteStore::new(":memory:").unwrap();
    let from = t(0) + Duration::microseconds(100);
    let to = t(0) + Duration::microseconds(600);
    let v = version("tick.json", 1, Interval::bounded(from, to).unwrap());
    store.insert_version(&v).unwrap();

    let loaded = store.get_version(v.id).unwrap().expect("version should exist");
    assert_eq!(loaded.interval, v.interval);

    let rendered = artifact("tick.json", &v, v.interval);
    store.save_artifact(rendered.clone()).unwrap();
    let found = store.find_artifacts_at(from).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].interval, v.interval);
    assert!(store.find_artifacts_at(to).unwrap().is_empty());
}

#[test]
fn test_sqlite_rejects_duplicate_version() {
    let store = SqliteStore::new(":memory:").unwrap();
    let v = version("a.json", 1, Interval::starting_at(t(0)));
    store.insert_version(&v).unwrap();
    assert!(store.insert_version(&v).is_err(), "Should reject duplicate version");
}

#[test]
fn test_find_versions_filters_by_overlap_and_orders_by_sequence() {
    let sqlite = SqliteStore::new(":memory:").unwrap();
    let memory = MemoryStore::new();

    let late = version("x.json", 2, Interval::bounded(t(15), t(20)).unwrap());
    let early = version("x.json", 1, Interval::bounded(t(-1000), t(10)).unwrap());
    let outside = version("x.json", 3, Interval::starting_at(t(200)));
    let other_item = version("y.json", 1, Interval::starting_at(t(0)));
    let withdrawn =
        version("x.json", 4, Interval::starting_at(t(0))).with_state(LifecycleState::Deleted);

    for v in [&late, &early, &outside, &other_item, &withdrawn] {
        sqlite.insert_version(v).unwrap();
        memory.insert_version(v.clone()).unwrap();
    }

    let window = Interval::bounded(t(0), t(100)).unwrap();
    let item = ItemUri::new("x.json");
    for found in [
        sqlite.find_versions(&item, &window).unwrap(),
        memory.find_versions(&item, &window).unwrap(),
    ] {
        let ids: Vec<_> = found.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }
}

#[test]
fn test_find_composing_versions() {
    let sqlite = SqliteStore::new(":memory:").unwrap();
    let memory = MemoryStore::new();

    let composer = version("page.json", 1, Interval::bounded(t(0), t(30)).unwrap())
        .with_reference(Reference::composition("footer.json"));
    let linker = version("other.json", 1, Interval::starting_at(t(0)))
        .with_reference(Reference::link("footer.json"));
    let stale = version("old.json", 1, Interval::bounded(t(-50), t(-10)).unwrap())
        .with_reference(Reference::composition("footer.json"));

    for v in [&composer, &linker, &stale] {
        sqlite.insert_version(v).unwrap();
        memory.insert_version(v.clone()).unwrap();
    }

    let window = Interval::starting_at(t(0));
    let item = ItemUri::new("footer.json");
    for found in [
        sqlite.find_composing_versions(&item, &window).unwrap(),
        memory.find_composing_versions(&item, &window).unwrap(),
    ] {
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, composer.id);
    }
}

#[test]
fn test_content_blobs() {
    let sqlite = SqliteStore::new(":memory:").unwrap();
    let blob = sqlite.put_content("k", b"one").unwrap();
    sqlite.put_content("k", b"two").unwrap();
    assert_eq!(sqlite.read_content(&blob).unwrap(), b"two".to_vec());
    assert!(sqlite.read_content(&ContentRef::new("missing")).is_err());

    let memory = MemoryStore::new();
    let blob = memory.put_content("k", b"one".to_vec()).unwrap();
    assert_eq!(memory.read_content(&blob).unwrap(), b"one".to_vec());
}

#[test]
fn test_artifact_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteStore::new(dir.path().join("pressroom.db")).unwrap();
    let memory = MemoryStore::new();
    let source = version("page.json", 1, Interval::starting_at(t(0)));

    let stores: [&dyn ArtifactStore<Error = pressroom_store::StoreError>; 2] = [&sqlite, &memory];
    for store in stores {
        let current = artifact("page.json", &source, Interval::bounded(t(0), t(10)).unwrap());
        let future = artifact("page.json", &source, Interval::starting_at(t(10)));
        store.save_artifact(current.clone()).unwrap();
        store.save_artifact(future.clone()).unwrap();
        assert!(store.save_artifact(current.clone()).is_err());

        let at_five = store.find_artifacts_at(t(5)).unwrap();
        assert_eq!(at_five.len(), 1);
        assert_eq!(at_five[0], current);

        let at_ten = store.find_artifacts_at(t(10)).unwrap();
        assert_eq!(at_ten.len(), 1);
        assert_eq!(at_ten[0].id, future.id);

        assert_eq!(store.find_artifacts_by_source(source.id).unwrap().len(), 2);
        assert_eq!(
            store.find_artifacts(&Interval::bounded(t(8), t(12)).unwrap()).unwrap().len(),
            2
        );

        assert!(store.delete_artifact(current.id).unwrap());
        assert!(!store.delete_artifact(current.id).unwrap(), "Second delete is a no-op");
        assert!(store.find_artifacts_at(t(5)).unwrap().is_empty());
        assert_eq!(store.list_artifacts().unwrap().len(), 1);

        let deleted = store.get_artifact(current.id).unwrap().unwrap();
        assert!(deleted.deleted);
    }
}
