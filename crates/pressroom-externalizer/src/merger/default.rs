//! Pass-through merger for content types without composition support

use super::{combination_identity, ContentMerger, MergeResult};
use crate::{ContentScope, ExternalizationError, NodeRef};
use pressroom_domain::VersionId;

/// Emits the root content unchanged
#[derive(Debug, Default)]
pub struct DefaultMerger {
    content: Option<Vec<u8>>,
    root: Option<(VersionId, String)>,
}

impl DefaultMerger {
    /// Create a merger with nothing visited
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentMerger for DefaultMerger {
    fn visit(&mut self, node: NodeRef<'_>, scope: &ContentScope) -> Result<(), ExternalizationError> {
        let version = node.version();
        if !node.is_root() {
            let content_type = match &self.root {
                Some((_, root_type)) => root_type.clone(),
                None => version.content_type.clone(),
            };
            return Err(ExternalizationError::NotComposable {
                content_type,
                item: version.item.clone(),
            });
        }
        self.content = Some(scope.with_current(|c| c.to_vec())?);
        self.root = Some((version.id, version.content_type.clone()));
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<MergeResult, ExternalizationError> {
        match (self.content, self.root) {
            (Some(content), Some((root, _))) => Ok(MergeResult {
                content,
                identity: Some(combination_identity(&[root])),
            }),
            _ => Err(ExternalizationError::EmptyTree),
        }
    }
}
