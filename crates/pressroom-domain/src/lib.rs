//! Pressroom Domain Layer
//!
//! This crate contains the value types and trait boundaries shared by every
//! other Pressroom crate. It carries no infrastructure: stores, mergers and
//! schedulers live elsewhere and talk to each other through the traits
//! defined in [`traits`].
//!
//! ## Key Concepts
//!
//! - **Item**: an addressable content entity, identified by an [`ItemUri`]
//! - **Version**: one time-bounded revision of an item, possibly composing other items
//! - **Interval**: half-open `[from, to)` validity range with overlap algebra
//! - **ExternalFile**: a finished, time-bounded artifact ready to publish
//! - **Destination**: a named file-system root that artifacts are synced to
//!
//! ## Architecture
//!
//! - Only fundamental primitives as dependencies (ids, instants, error derive)
//! - Pure value logic, no I/O
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod destination;
pub mod error;
pub mod interval;
pub mod item;
pub mod traits;
pub mod version;

// Re-exports for convenience
pub use artifact::{ArtifactId, ExternalFile};
pub use destination::Destination;
pub use error::ValidationError;
pub use interval::{Instant, Interval, IntervalEnd};
pub use item::ItemUri;
pub use version::{ContentRef, LifecycleState, Reference, ReferenceKind, Version, VersionId};
