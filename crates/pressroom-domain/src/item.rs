//! Item identity

use crate::ValidationError;
use std::fmt;
use std::path::PathBuf;

/// Addressable identity of an item, e.g. `guides/setup.json`
///
/// Segments are separated by `/`. The URI doubles as the item's relative
/// location under every destination root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemUri(String);

impl ItemUri {
    /// Wrap a URI string; leading and trailing `/` are trimmed
    pub fn new(uri: impl Into<String>) -> Self {
        let uri: String = uri.into();
        Self(uri.trim_matches('/').to_string())
    }

    /// The URI as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Map the URI to a relative file-system path
    ///
    /// # Errors
    ///
    /// Rejects empty URIs, empty segments, `.`/`..` segments and segments
    /// containing a backslash or NUL.
    ///
    /// # Examples
    ///
    /// ```
    /// use pressroom_domain::ItemUri;
    ///
    /// let path = ItemUri::new("guides/setup.json").to_relative_path().unwrap();
    /// assert_eq!(path, std::path::PathBuf::from("guides").join("setup.json"));
    /// assert!(ItemUri::new("../etc/passwd").to_relative_path().is_err());
    /// ```
    pub fn to_relative_path(&self) -> Result<PathBuf, ValidationError> {
        if self.0.is_empty() {
            return Err(self.invalid("empty URI"));
        }
        let mut path = PathBuf::new();
        for segment in self.0.split('/') {
            match segment {
                "" => return Err(self.invalid("empty path segment")),
                "." | ".." => return Err(self.invalid("relative path segment")),
                s if s.contains('\\') || s.contains('\0') => {
                    return Err(self.invalid("forbidden character"))
                }
                s => path.push(s),
            }
        }
        Ok(path)
    }

    /// File-name-safe slug of the URI, used to prefix rewritten ids
    pub fn slug(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect()
    }

    fn invalid(&self, reason: &'static str) -> ValidationError {
        ValidationError::InvalidItemUri {
            uri: self.0.clone(),
            reason,
        }
    }
}

impl fmt::Display for ItemUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemUri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
