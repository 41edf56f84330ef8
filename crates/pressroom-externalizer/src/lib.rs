//! Pressroom Externalizer
//!
//! Turns a changed version into finished, time-bounded artifacts.
//!
//! # Overview
//!
//! A version may compose other items. Every composed item can have several
//! versions, each valid over its own interval, so the content that should be
//! published changes over time. The externalizer resolves every combination
//! of versions that is valid over some interval, merges each combination
//! into artifact bytes and persists one [`ExternalFile`] per combination.
//!
//! # Architecture
//!
//! ```text
//! Version → Externalizer → TemporalResolver → ContentMerger → ArtifactStore
//!                 ↓
//!            Rescheduler (publish timetable)
//! ```
//!
//! # Key Features
//!
//! - **Copy-on-split resolution**: competing candidates fork the tree, sharing
//!   one node arena
//! - **Visitor merging**: pass-through and structured-document mergers chosen
//!   by content type
//! - **Dependency expansion**: versions composing a changed item are
//!   re-externalized transitively
//! - **Serialized walks**: one engine lock, one background worker
//!
//! # Example Usage
//!
//! ```no_run
//! use pressroom_externalizer::{Externalizer, ExternalizerConfig, ExternalizerService};
//! use pressroom_store::MemoryStore;
//! use pressroom_domain::VersionId;
//! use std::sync::Arc;
//!
//! # async fn example(id: VersionId) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let engine = Externalizer::new(store, ExternalizerConfig::default());
//! let service = ExternalizerService::start(engine);
//!
//! let files = service.externalize_async(id).wait().await?;
//! println!("Produced {} artifacts", files.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`ExternalFile`]: pressroom_domain::ExternalFile

#![warn(missing_docs)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod merger;
pub mod resolver;
pub mod scope;
pub mod service;
pub mod tree;


pub use config::ExternalizerConfig;
pub use coordinator::{Externalizer, ExternalizerStore};
pub use error::{ExternalizationError, ExternalizeError};
pub use merger::{
    ContentMerger, ContentTypeMergers, DefaultMerger, MergeResult, MergerFactory,
    StructuredDocumentMerger, STRUCTURED_DOCUMENT_TYPE,
};
pub use resolver::TemporalResolver;
pub use scope::{ContentScope, ScopeGuard};
pub use service::{ExternalizeHandle, ExternalizeResult, ExternalizerService};
pub use tree::{Node, NodeArena, NodeId, NodeRef, TemporalReferenceTree, TreeStructure};
