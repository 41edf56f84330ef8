//! Content mergers
//!
//! A merger is bound to one tree. It is visited once per node, parent before
//! children, and then finished exactly once to produce the artifact bytes.
//! The merger is chosen from the root version's content type by a
//! [`MergerFactory`].

mod default;
mod document;

pub use default::DefaultMerger;
pub use document::StructuredDocumentMerger;

use crate::{ContentScope, ExternalizationError, NodeRef};
use pressroom_domain::{Version, VersionId};
use sha2::{Digest, Sha256};

/// Content type handled by [`StructuredDocumentMerger`]
pub const STRUCTURED_DOCUMENT_TYPE: &str = "application/vnd.pressroom.document+json";

/// Finished content of one tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Artifact bytes
    pub content: Vec<u8>,
    /// Identity of the version combination, if the merger computes one
    pub identity: Option<String>,
}

/// Visitor that folds a tree's nodes into artifact content
pub trait ContentMerger {
    /// Absorb one node; its raw content is current in `scope`
    fn visit(&mut self, node: NodeRef<'_>, scope: &ContentScope)
        -> Result<(), ExternalizationError>;

    /// Produce the artifact
    fn finish(self: Box<Self>) -> Result<MergeResult, ExternalizationError>;
}

/// Creates a fresh merger for each tree
pub trait MergerFactory: Send + Sync {
    /// Merger for a tree rooted at `root`
    fn create(&self, root: &Version) -> Box<dyn ContentMerger>;
}

/// Selects the merger by the root's content type
///
/// Structured documents get a [`StructuredDocumentMerger`]; everything else
/// passes through a [`DefaultMerger`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTypeMergers;

impl MergerFactory for ContentTypeMergers {
    fn create(&self, root: &Version) -> Box<dyn ContentMerger> {
        if root.content_type == STRUCTURED_DOCUMENT_TYPE {
            Box::new(StructuredDocumentMerger::new())
        } else {
            Box::new(DefaultMerger::new())
        }
    }
}

/// Hex SHA-256 over the sorted, de-duplicated version ids
///
/// # Examples
///
/// ```
/// use pressroom_domain::VersionId;
/// use pressroom_externalizer::merger::combination_identity;
///
/// let a = VersionId::from_value(1);
/// let b = VersionId::from_value(2);
/// assert_eq!(combination_identity(&[a, b, a]), combination_identity(&[b, a]));
/// ```
pub fn combination_identity(versions: &[VersionId]) -> String {
    let mut ids: Vec<VersionId> = versions.to_vec();
    ids.sort();
    ids.dedup();

    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.value().to_be_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pressroom_domain::{ContentRef, Interval};

    #[test]
    fn test_identity_is_order_independent() {
        let a = VersionId::from_value(7);
        let b = VersionId::from_value(9);
        let id = combination_identity(&[a, b]);
        assert_eq!(id, combination_identity(&[b, a]));
        assert_eq!(id.len(), 64);
        assert_ne!(id, combination_identity(&[a]));
    }

    #[test]
    fn test_factory_selects_by_content_type() {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let doc = Version::new(
            "page",
            1,
            Interval::starting_at(t),
            STRUCTURED_DOCUMENT_TYPE,
            ContentRef::new("page"),
        );
        let plain = Version::new("page", 1, Interval::starting_at(t), "text/plain", ContentRef::new("p"));

        // Neither merger can finish before its root was visited.
        for root in [doc, plain] {
            let merger = ContentTypeMergers.create(&root);
            assert_eq!(merger.finish(), Err(ExternalizationError::EmptyTree));
        }
    }
}
