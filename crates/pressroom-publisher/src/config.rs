//! Configuration for publishing
//!
//! Startup delay, timer slice length and file-tree housekeeping.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the publish scheduler
///
/// # Examples
///
/// ```
/// use pressroom_publisher::PublisherConfig;
///
/// // Default configuration
/// let config = PublisherConfig::default();
/// assert_eq!(config.startup_delay_secs, 5);
///
/// // Fire the startup reconciliation right away
/// let config = PublisherConfig::immediate();
/// assert_eq!(config.startup_delay_secs, 0);
///
/// // Log what would change without touching destinations
/// let config = PublisherConfig::dry_run();
/// assert!(config.dry_run);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Delay before the startup reconciliation (in seconds)
    /// Default: 5
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Longest single sleep of the timer worker before it re-reads the
    /// wall clock (in seconds)
    /// Default: 60
    #[serde(default = "default_max_sleep_secs")]
    pub max_sleep_secs: u64,

    /// Remove directories left empty after stale files are deleted
    /// Default: true
    #[serde(default = "default_prune_empty_dirs")]
    pub prune_empty_dirs: bool,

    /// Dry-run mode: log what would be written or deleted without touching
    /// the destination
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

fn default_startup_delay_secs() -> u64 {
    5
}

fn default_max_sleep_secs() -> u64 {
    60
}

fn default_prune_empty_dirs() -> bool {
    true
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: default_startup_delay_secs(),
            max_sleep_secs: default_max_sleep_secs(),
            prune_empty_dirs: default_prune_empty_dirs(),
            dry_run: false,
        }
    }
}

impl PublisherConfig {
    /// Startup reconciliation without delay and short timer slices
    ///
    /// Suitable for tests and one-shot tooling.
    pub fn immediate() -> Self {
        Self {
            startup_delay_secs: 0,
            max_sleep_secs: 1,
            ..Self::default()
        }
    }

    /// Default timing, no changes to destinations
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Get the startup delay as Duration
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    /// Get the maximum sleep slice as Duration
    pub fn max_sleep(&self) -> Duration {
        Duration::from_secs(self.max_sleep_secs)
    }

    /// Check the configuration for values the scheduler cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sleep_secs == 0 {
            return Err("publisher.max_sleep_secs must be at least 1".to_string());
        }
        Ok(())
    }
}
