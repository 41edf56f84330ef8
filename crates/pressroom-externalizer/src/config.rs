//! Configuration for the Externalizer
//!
//! Resolver limits and root-inclusion policy.

use serde::{Deserialize, Serialize};

/// Configuration for externalization runs
///
/// # Examples
///
/// ```
/// use pressroom_externalizer::ExternalizerConfig;
///
/// let config = ExternalizerConfig::default();
/// assert_eq!(config.max_depth, 32);
/// assert!(!config.publish_standalone);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalizerConfig {
    /// Deepest allowed composition nesting below the root
    /// Default: 32
    pub max_depth: usize,

    /// Externalize versions without composition references too
    /// Default: false (only composing versions produce artifacts)
    pub publish_standalone: bool,
}

impl Default for ExternalizerConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            publish_standalone: false,
        }
    }
}

impl ExternalizerConfig {
    /// Every version produces artifacts, composing or not
    pub fn standalone() -> Self {
        Self {
            publish_standalone: true,
            ..Self::default()
        }
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("externalizer.max_depth must be at least 1".to_string());
        }
        Ok(())
    }
}
