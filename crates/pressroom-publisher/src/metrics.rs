//! Metrics collection for publishing

use crate::reconcile::DestinationReport;
use std::collections::BTreeMap;

/// Counters for one destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationMetrics {
    /// Files written (new or changed content)
    pub written: usize,
    /// Desired files already identical on disk
    pub unchanged: usize,
    /// Stale files removed
    pub deleted: usize,
    /// Empty directories removed
    pub pruned: usize,
    /// Per-file write, delete and walk failures
    pub failures: usize,
}

/// Metrics collected across publish ticks
#[derive(Debug, Clone, Default)]
pub struct PublishMetrics {
    /// Ticks performed
    pub ticks: usize,

    /// Ticks that failed before reconciling (store or registry errors)
    pub failed_ticks: usize,

    /// Counters per destination name
    pub destinations: BTreeMap<String, DestinationMetrics>,
}

impl PublishMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed tick
    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    /// Record a tick that could not run
    pub fn record_failed_tick(&mut self) {
        self.failed_ticks += 1;
    }

    /// Fold one destination's reconciliation into the counters
    pub fn record_destination(&mut self, name: &str, report: &DestinationReport) {
        let entry = self.destinations.entry(name.to_string()).or_default();
        entry.written += report.written;
        entry.unchanged += report.unchanged;
        entry.deleted += report.deleted;
        entry.pruned += report.pruned;
        entry.failures += report.failures.len();
    }

    /// Files written across all destinations
    pub fn total_written(&self) -> usize {
        self.destinations.values().map(|d| d.written).sum()
    }

    /// Files deleted across all destinations
    pub fn total_deleted(&self) -> usize {
        self.destinations.values().map(|d| d.deleted).sum()
    }

    /// Failures across all destinations
    pub fn total_failures(&self) -> usize {
        self.destinations.values().map(|d| d.failures).sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.ticks = 0;
        self.failed_ticks = 0;
        self.destinations.clear();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Publish Metrics Summary".to_string(),
            "=======================".to_string(),
            format!("Ticks: {} ({} failed)", self.ticks, self.failed_ticks),
            String::new(),
        ];

        for (name, d) in &self.destinations {
            lines.push(format!("{}:", name));
            lines.push(format!("  Written: {}", d.written));
            lines.push(format!("  Unchanged: {}", d.unchanged));
            lines.push(format!("  Deleted: {}", d.deleted));
            lines.push(format!("  Pruned dirs: {}", d.pruned));
            lines.push(format!("  Failures: {}", d.failures));
        }

        if !self.destinations.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "Total: {} written, {} deleted, {} failures",
                self.total_written(),
                self.total_deleted(),
                self.total_failures()
            ));
        }

        lines.join("\n")
    }
}
