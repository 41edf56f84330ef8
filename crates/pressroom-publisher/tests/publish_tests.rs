//! Integration tests for pressroom-publisher
//!
//! Destinations are temporary directories; artifacts live in a MemoryStore.

use chrono::{Duration, Utc};
use pressroom_domain::traits::{ArtifactStore, Rescheduler};
use pressroom_domain::{
    ArtifactId, Destination, ExternalFile, Instant, Interval, ItemUri, LifecycleState, VersionId,
};
use pressroom_publisher::{PublishScheduler, PublisherConfig, TimerState};
use pressroom_store::MemoryStore;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn artifact(item: &str, content: &str, interval: Interval) -> ExternalFile {
    ExternalFile {
        id: ArtifactId::new(),
        item: ItemUri::new(item),
        source_version: VersionId::new(),
        interval,
        content: content.as_bytes().to_vec(),
        identity: None,
        state: LifecycleState::Active,
        deleted: false,
        created_at: Utc::now(),
    }
}

fn around(now: Instant) -> Interval {
    Interval::bounded(now - Duration::hours(1), now + Duration::hours(1)).unwrap()
}

fn scheduler(
    store: &Arc<MemoryStore>,
    destinations: Vec<Destination>,
    config: PublisherConfig,
) -> PublishScheduler<MemoryStore, Vec<Destination>> {
    PublishScheduler::new(Arc::clone(store), Arc::new(destinations), config)
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

#[tokio::test]
async fn test_tick_replaces_stale_tree_with_desired_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("web");
    fs::create_dir_all(root.join("gone")).unwrap();
    fs::write(root.join("old.json"), "stale").unwrap();
    fs::write(root.join("gone/x.json"), "stale").unwrap();

    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    store.save_artifact(artifact("page.json", "page", around(now))).unwrap();
    store.save_artifact(artifact("guides/setup.json", "setup", around(now))).unwrap();
    store
        .save_artifact(artifact("future.json", "later", Interval::starting_at(now + Duration::days(1))))
        .unwrap();

    let publisher = scheduler(&store, vec![Destination::new("web", &root)], PublisherConfig::immediate());
    let report = publisher.on_timer_fire(now).await.unwrap();

    assert_eq!(report.artifacts, 2);
    assert_eq!(report.failure_count(), 0);
    assert_eq!(read(&root, "page.json"), "page");
    assert_eq!(read(&root, "guides/setup.json"), "setup");
    assert!(!root.join("old.json").exists());
    assert!(!root.join("future.json").exists());
    assert!(!root.join("gone").exists(), "Emptied directory is pruned");

    let (_, web) = &report.destinations[0];
    assert_eq!((web.written, web.deleted, web.pruned), (2, 2, 1));
}

#[tokio::test]
async fn test_second_tick_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    store.save_artifact(artifact("a/page.json", "page", around(now))).unwrap();

    let publisher = scheduler(
        &store,
        vec![Destination::new("web", dir.path())],
        PublisherConfig::immediate(),
    );
    publisher.on_timer_fire(now).await.unwrap();
    let second = publisher.on_timer_fire(now).await.unwrap();

    let (_, web) = &second.destinations[0];
    assert_eq!((web.written, web.unchanged, web.deleted), (0, 1, 0));

    let metrics = publisher.metrics();
    assert_eq!(metrics.ticks, 2);
    assert_eq!(metrics.destinations["web"].written, 1);
    assert_eq!(metrics.destinations["web"].unchanged, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_simultaneous_ticks_on_one_destination_do_not_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("web");
    fs::create_dir_all(root.join("old")).unwrap();
    for i in 0..20 {
        fs::write(root.join(format!("old/stale-{i}.json")), "stale").unwrap();
    }

    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    for i in 0..20 {
        store
            .save_artifact(artifact(&format!("pages/p{i}.json"), "fresh", around(now)))
            .unwrap();
    }

    let publisher = scheduler(&store, vec![Destination::new("web", &root)], PublisherConfig::immediate());
    let (a, b) = tokio::join!(publisher.on_timer_fire(now), publisher.on_timer_fire(now));
    let (a, b) = (a.unwrap(), b.unwrap());
    let (_, a) = &a.destinations[0];
    let (_, b) = &b.destinations[0];

    assert!(a.failures.is_empty() && b.failures.is_empty());
    assert_eq!(a.deleted + b.deleted, 20, "Each stale file is deleted exactly once");
    assert_eq!(a.written + b.written, 20, "Each desired file is written exactly once");
    assert_eq!(a.unchanged + b.unchanged, 20);
    assert!(!root.join("old").exists());
    assert_eq!(read(&root, "pages/p7.json"), "fresh");
}

#[tokio::test]
async fn test_boundary_tick_swaps_content() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let switch = now + Duration::hours(2);
    let store = Arc::new(MemoryStore::new());
    store
        .save_artifact(artifact("page.json", "v1", Interval::bounded(now, switch).unwrap()))
        .unwrap();
    store
        .save_artifact(artifact("page.json", "v2", Interval::starting_at(switch)))
        .unwrap();

    let publisher = scheduler(&store, vec![Destination::new("web", dir.path())], PublisherConfig::immediate());
    publisher.on_timer_fire(now).await.unwrap();
    assert_eq!(read(dir.path(), "page.json"), "v1");

    publisher.on_timer_fire(switch).await.unwrap();
    assert_eq!(read(dir.path(), "page.json"), "v2");
}

#[tokio::test]
async fn test_only_active_artifacts_are_published() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    let mut draft = artifact("draft.json", "draft", around(now));
    draft.state = LifecycleState::Draft;
    store.save_artifact(draft).unwrap();
    store.save_artifact(artifact("live.json", "live", around(now))).unwrap();

    let publisher = scheduler(&store, vec![Destination::new("web", dir.path())], PublisherConfig::immediate());
    let report = publisher.on_timer_fire(now).await.unwrap();

    assert_eq!(report.artifacts, 1);
    assert!(dir.path().join("live.json").exists());
    assert!(!dir.path().join("draft.json").exists());
}

#[tokio::test]
async fn test_destinations_filter_by_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    store.save_artifact(artifact("guides/setup.json", "setup", around(now))).unwrap();
    store.save_artifact(artifact("news/today.json", "today", around(now))).unwrap();

    let everything = Destination::new("all", dir.path().join("all"));
    let mut guides = Destination::new("guides", dir.path().join("guides"));
    guides.prefixes = vec!["guides/".to_string()];

    let publisher = scheduler(&store, vec![everything, guides], PublisherConfig::immediate());
    publisher.on_timer_fire(now).await.unwrap();

    assert!(dir.path().join("all/news/today.json").exists());
    assert!(dir.path().join("all/guides/setup.json").exists());
    assert!(dir.path().join("guides/guides/setup.json").exists());
    assert!(!dir.path().join("guides/news").exists());
}

#[tokio::test]
async fn test_failed_file_does_not_abort_tick() {
    let dir = tempfile::tempdir().unwrap();
    // A directory sits where a file has to go; the rename onto it fails.
    fs::create_dir_all(dir.path().join("blocked.json/inner")).unwrap();

    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    store.save_artifact(artifact("blocked.json", "blocked", around(now))).unwrap();
    store.save_artifact(artifact("fine.json", "fine", around(now))).unwrap();

    let publisher = scheduler(&store, vec![Destination::new("web", dir.path())], PublisherConfig::immediate());
    let report = publisher.on_timer_fire(now).await.unwrap();

    assert_eq!(report.failure_count(), 1);
    assert_eq!(read(dir.path(), "fine.json"), "fine");
    assert_eq!(publisher.metrics().total_failures(), 1);

    // The blocking directory was empty and got pruned; the next tick succeeds.
    let retry = publisher.on_timer_fire(now).await.unwrap();
    assert_eq!(retry.failure_count(), 0);
    assert_eq!(read(dir.path(), "blocked.json"), "blocked");
}

#[tokio::test]
async fn test_dry_run_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("stale.json"), "stale").unwrap();

    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    store.save_artifact(artifact("page.json", "page", around(now))).unwrap();

    let publisher = scheduler(&store, vec![Destination::new("web", dir.path())], PublisherConfig::dry_run());
    let report = publisher.on_timer_fire(now).await.unwrap();

    let (_, web) = &report.destinations[0];
    assert_eq!((web.written, web.deleted), (1, 1));
    assert!(dir.path().join("stale.json").exists());
    assert!(!dir.path().join("page.json").exists());
}

#[test]
fn test_timetable_arms_boundaries_and_startup() {
    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    let later = now + Duration::hours(3);
    let end = now + Duration::hours(5);
    store
        .save_artifact(artifact("page.json", "p", Interval::bounded(later, end).unwrap()))
        .unwrap();
    store
        .save_artifact(artifact("old.json", "o", Interval::bounded(now - Duration::days(2), now - Duration::days(1)).unwrap()))
        .unwrap();

    let config = PublisherConfig {
        startup_delay_secs: 60,
        ..PublisherConfig::default()
    };
    let publisher = scheduler(&store, Vec::new(), config);

    // later, end and the startup instant; both past boundaries stay unarmed
    assert_eq!(publisher.rebuild_timetable().unwrap(), 3);
    let next = publisher.next_fire().unwrap();
    assert!(next > now && next < later, "Startup instant fires first");

    let table = publisher.timetable();
    assert_eq!(table.iter().filter(|(_, s)| *s == TimerState::Unarmed).count(), 2);
    assert!(table.contains(&(later, TimerState::Armed)));
    assert!(table.contains(&(end, TimerState::Armed)));

    // Second rebuild: no startup instant, the old startup timer is cancelled
    assert_eq!(publisher.rebuild_timetable().unwrap(), 2);
    assert!(publisher.timetable().contains(&(next, TimerState::Cancelled)));
    assert_eq!(publisher.next_fire(), Some(later));
}

#[tokio::test]
async fn test_timer_worker_fires_startup_reconciliation() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    store.save_artifact(artifact("page.json", "page", around(now))).unwrap();

    let publisher = scheduler(&store, vec![Destination::new("web", dir.path())], PublisherConfig::immediate());
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let worker = publisher.clone();
    let handle = tokio::spawn(async move {
        worker
            .run(async {
                let _ = stopped.await;
            })
            .await
    });

    publisher.reschedule();
    let target = dir.path().join("page.json");
    for _ in 0..100 {
        if target.exists() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert_eq!(read(dir.path(), "page.json"), "page");

    stop.send(()).unwrap();
    handle.await.unwrap();
    assert!(publisher.metrics().ticks >= 1);
}
