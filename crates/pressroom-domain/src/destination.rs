//! Publish destinations

use crate::{ItemUri, ValidationError};
use std::path::PathBuf;

/// A named file-system root that artifacts are synced to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Unique destination name
    pub name: String,

    /// Root directory
    pub root: PathBuf,

    /// Item URI prefixes this destination accepts (empty: all items)
    pub prefixes: Vec<String>,
}

impl Destination {
    /// Destination accepting every item
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            prefixes: Vec::new(),
        }
    }

    /// True if the destination publishes `item`
    pub fn accepts(&self, item: &ItemUri) -> bool {
        self.prefixes.is_empty()
            || self
                .prefixes
                .iter()
                .any(|p| item.as_str().starts_with(p.trim_start_matches('/')))
    }

    /// Absolute path of `item` under this destination
    pub fn path_for(&self, item: &ItemUri) -> Result<PathBuf, ValidationError> {
        Ok(self.root.join(item.to_relative_path()?))
    }
}
