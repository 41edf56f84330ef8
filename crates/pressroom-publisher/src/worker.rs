//! Publish scheduler and its timer worker

use crate::reconcile::{reconcile, DestinationReport, ReconcileOptions};
use crate::schedule::{derive_schedule, until, Timetable, TimerState};
use crate::{PublishMetrics, PublisherConfig, SchedulingError};
use chrono::Utc;
use pressroom_domain::traits::{ArtifactStore, DestinationRegistry, Rescheduler};
use pressroom_domain::{Instant, LifecycleState};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// Result of one publish tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Instant the tick reconciled against
    pub instant: Option<Instant>,
    /// Artifacts visible at that instant
    pub artifacts: usize,
    /// Outcome per destination name
    pub destinations: Vec<(String, DestinationReport)>,
}

impl TickReport {
    /// Failures across all destinations
    pub fn failure_count(&self) -> usize {
        self.destinations.iter().map(|(_, r)| r.failures.len()).sum()
    }
}

struct Shared<S, R> {
    store: Arc<S>,
    destinations: Arc<R>,
    config: PublisherConfig,
    timetable: Mutex<Timetable>,
    metrics: Mutex<PublishMetrics>,
    destination_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    wake: Notify,
}

/// Keeps every destination in sync with the artifacts valid right now
///
/// Cloning is cheap; clones share the timetable, metrics and locks.
///
/// # Examples
///
/// ```no_run
/// use pressroom_domain::{traits::Rescheduler, Destination};
/// use pressroom_publisher::{PublishScheduler, PublisherConfig};
/// use pressroom_store::MemoryStore;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let store = Arc::new(MemoryStore::new());
///     let destinations = Arc::new(vec![Destination::new("web", "/srv/web")]);
///     let scheduler = PublishScheduler::new(store, destinations, PublisherConfig::default());
///
///     scheduler.reschedule();
///     scheduler
///         .run(async {
///             let _ = tokio::signal::ctrl_c().await;
///         })
///         .await;
/// }
/// ```
pub struct PublishScheduler<S, R> {
    shared: Arc<Shared<S, R>>,
}

impl<S, R> Clone for PublishScheduler<S, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S, R> PublishScheduler<S, R>
where
    S: ArtifactStore + 'static,
    R: DestinationRegistry + 'static,
{
    /// Create a scheduler with an empty timetable
    pub fn new(store: Arc<S>, destinations: Arc<R>, config: PublisherConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                destinations,
                config,
                timetable: Mutex::new(Timetable::new()),
                metrics: Mutex::new(PublishMetrics::new()),
                destination_locks: Mutex::new(HashMap::new()),
                wake: Notify::new(),
            }),
        }
    }

    /// The scheduler configuration
    pub fn config(&self) -> &PublisherConfig {
        &self.shared.config
    }

    /// Distinct interval boundaries of every live artifact
    pub fn schedule(&self) -> Result<BTreeSet<Instant>, SchedulingError> {
        let artifacts = self
            .shared
            .store
            .list_artifacts()
            .map_err(|e| SchedulingError::Store(e.to_string()))?;
        Ok(derive_schedule(&artifacts))
    }

    /// Recompute the schedule and re-arm the timer table
    ///
    /// The first call also arms `now + startup_delay`. Returns the number of
    /// armed timers.
    pub fn rebuild_timetable(&self) -> Result<usize, SchedulingError> {
        let now = Utc::now();
        let mut schedule = self.schedule()?;

        let mut timetable = lock(&self.shared.timetable);
        if !timetable.has_run() {
            let delay = chrono::Duration::from_std(self.shared.config.startup_delay())
                .map_err(|e| SchedulingError::InstantOutOfRange(e.to_string()))?;
            let startup = now.checked_add_signed(delay).ok_or_else(|| {
                SchedulingError::InstantOutOfRange(format!(
                    "startup delay of {}s",
                    self.shared.config.startup_delay_secs
                ))
            })?;
            schedule.insert(startup);
        }
        let armed = timetable.rearm(&schedule, now);
        drop(timetable);

        self.shared.wake.notify_one();
        tracing::info!(
            instants = schedule.len(),
            armed,
            "Publish timetable rebuilt"
        );
        Ok(armed)
    }

    /// Snapshot of the timer table
    pub fn timetable(&self) -> Vec<(Instant, TimerState)> {
        lock(&self.shared.timetable).entries()
    }

    /// Earliest armed instant
    pub fn next_fire(&self) -> Option<Instant> {
        lock(&self.shared.timetable).next_armed()
    }

    /// Metrics accumulated by every tick so far
    pub fn metrics(&self) -> PublishMetrics {
        lock(&self.shared.metrics).clone()
    }

    /// Reconcile every destination against the artifacts valid at `instant`
    ///
    /// Destinations run in parallel on blocking threads; one destination
    /// never reconciles twice at the same time. Per-file failures are
    /// reported, not returned.
    pub async fn on_timer_fire(&self, instant: Instant) -> Result<TickReport, SchedulingError> {
        let outcome = self.tick(instant).await;
        let mut metrics = lock(&self.shared.metrics);
        match &outcome {
            Ok(report) => {
                metrics.record_tick();
                for (name, destination) in &report.destinations {
                    metrics.record_destination(name, destination);
                }
            }
            Err(_) => metrics.record_failed_tick(),
        }
        outcome
    }

    async fn tick(&self, instant: Instant) -> Result<TickReport, SchedulingError> {
        let shared = Arc::clone(&self.shared);
        let (artifacts, destinations) = tokio::task::spawn_blocking(move || {
            let artifacts = shared
                .store
                .find_artifacts_at(instant)
                .map_err(|e| SchedulingError::Store(e.to_string()))?;
            let destinations = shared
                .destinations
                .list_destinations()
                .map_err(|e| SchedulingError::Destinations(e.to_string()))?;
            Ok::<_, SchedulingError>((artifacts, destinations))
        })
        .await
        .map_err(|e| SchedulingError::Worker(e.to_string()))??;

        let artifacts: Arc<Vec<_>> = Arc::new(
            artifacts
                .into_iter()
                .filter(|a| a.state == LifecycleState::Active)
                .collect(),
        );
        tracing::info!(
            instant = %instant,
            artifacts = artifacts.len(),
            destinations = destinations.len(),
            "Publish tick"
        );

        let options = ReconcileOptions {
            dry_run: self.shared.config.dry_run,
            prune_empty_dirs: self.shared.config.prune_empty_dirs,
        };
        let mut tasks = Vec::with_capacity(destinations.len());
        for destination in destinations {
            let guard = self.destination_lock(&destination.name);
            let artifacts = Arc::clone(&artifacts);
            let name = destination.name.clone();
            let task = tokio::task::spawn_blocking(move || {
                let _serialized = lock(&guard);
                reconcile(&destination, &artifacts, options)
            });
            tasks.push((name, task));
        }

        let mut report = TickReport {
            instant: Some(instant),
            artifacts: artifacts.len(),
            destinations: Vec::with_capacity(tasks.len()),
        };
        for (name, task) in tasks {
            match task.await {
                Ok(destination) => {
                    for failure in &destination.failures {
                        tracing::warn!(destination = %name, "{}", failure);
                    }
                    report.destinations.push((name, destination));
                }
                Err(e) => {
                    tracing::error!(destination = %name, "Reconciliation task failed: {}", e);
                    return Err(SchedulingError::Worker(e.to_string()));
                }
            }
        }
        Ok(report)
    }

    fn destination_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = lock(&self.shared.destination_locks);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    /// Run the timer worker until `shutdown` completes
    ///
    /// The worker sleeps toward the earliest armed instant in slices of at
    /// most `max_sleep_secs`, re-reading the wall clock after each slice, and
    /// wakes early whenever the timetable is rebuilt. When several instants
    /// are due at once only the latest is reconciled.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let max_sleep = self.shared.config.max_sleep();
        tracing::info!(
            "Publish scheduler started (max sleep: {:?}, dry run: {})",
            max_sleep,
            self.shared.config.dry_run
        );

        loop {
            let sleep_for = self
                .next_fire()
                .map_or(max_sleep, |at| until(at).min(max_sleep));

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.shared.wake.notified() => {
                    tracing::debug!("Timetable changed, recomputing next fire");
                    continue;
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, stopping publish scheduler");
                    break;
                }
            }

            let due = lock(&self.shared.timetable).take_due(Utc::now());
            let Some(&latest) = due.last() else {
                continue;
            };
            if due.len() > 1 {
                tracing::debug!(skipped = due.len() - 1, "Coalesced overdue timers");
            }
            match self.on_timer_fire(latest).await {
                Ok(report) => tracing::info!(
                    instant = %latest,
                    failures = report.failure_count(),
                    "Publish tick completed"
                ),
                Err(e) => tracing::error!(instant = %latest, "Publish tick failed: {}", e),
            }
        }

        tracing::info!("Publish scheduler stopped. Final metrics:\n{}", self.metrics().summary());
    }

    /// Reconcile once at `instant` outside of the timer loop
    pub async fn publish_at(&self, instant: Instant) -> Result<TickReport, SchedulingError> {
        lock(&self.shared.timetable).mark_fired(instant);
        self.on_timer_fire(instant).await
    }
}

impl<S, R> Rescheduler for PublishScheduler<S, R>
where
    S: ArtifactStore + 'static,
    R: DestinationRegistry + 'static,
{
    fn reschedule(&self) {
        if let Err(e) = self.rebuild_timetable() {
            tracing::error!("Reschedule failed: {}", e);
        }
    }
}
