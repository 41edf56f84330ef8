//! Pressroom Publisher
//!
//! Keeps file-system destinations in sync with the artifacts that are valid
//! at the current wall-clock time.
//!
//! # Overview
//!
//! The publisher is responsible for:
//! - **Schedule derivation**: every distinct start and finite end of every
//!   live artifact interval is an instant at which published content changes
//! - **Timers**: one wall-clock timer per future instant, rebuilt wholesale
//!   whenever artifacts change
//! - **Reconciliation**: at each tick, every destination's tree is made to
//!   hold exactly the artifacts valid at that instant
//! - **Metrics collection**: files written, unchanged, deleted and failed per
//!   destination
//!
//! # Usage
//!
//! ## One-time Reconciliation
//!
//! ```no_run
//! use chrono::Utc;
//! use pressroom_domain::Destination;
//! use pressroom_publisher::{PublishScheduler, PublisherConfig};
//! use pressroom_store::SqliteStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::new("pressroom.db")?);
//! let destinations = Arc::new(vec![Destination::new("web", "/srv/web")]);
//! let scheduler = PublishScheduler::new(store, destinations, PublisherConfig::default());
//!
//! let report = scheduler.publish_at(Utc::now()).await?;
//! println!("{} failures", report.failure_count());
//! println!("{}", scheduler.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! The publisher can be configured via TOML:
//!
//! ```toml
//! [publisher]
//! startup_delay_secs = 5
//! max_sleep_secs = 60
//! prune_empty_dirs = true
//! dry_run = false
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
pub mod reconcile;
pub mod schedule;
mod worker;

pub use config::PublisherConfig;
pub use error::{ReconciliationError, SchedulingError};
pub use metrics::{DestinationMetrics, PublishMetrics};
pub use reconcile::{reconcile, DestinationReport, ReconcileOptions};
pub use schedule::{derive_schedule, TimerState, Timetable};
pub use worker::{PublishScheduler, TickReport};
