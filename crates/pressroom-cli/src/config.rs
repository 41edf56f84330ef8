//! Configuration file parsing for the CLI.
//!
//! One TOML file describes the store, both engines, the destinations and the
//! log level:
//!
//! ```toml
//! log_level = "info"
//!
//! [store]
//! path = "pressroom.db"
//!
//! [externalizer]
//! max_depth = 32
//!
//! [publisher]
//! startup_delay_secs = 5
//!
//! [[destinations]]
//! name = "web"
//! root = "/srv/web"
//! prefixes = ["public/"]
//! ```

use crate::error::{CliError, Result};
use pressroom_domain::Destination;
use pressroom_externalizer::ExternalizerConfig;
use pressroom_publisher::PublisherConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Artifact and version store
    #[serde(default)]
    pub store: StoreConfig,

    /// Externalization engine settings
    #[serde(default)]
    pub externalizer: ExternalizerConfig,

    /// Publish scheduler settings
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Publish destinations
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

/// Store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path (`:memory:` for a throwaway store)
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// One destination entry.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    /// Unique name
    pub name: String,

    /// Root directory
    pub root: PathBuf,

    /// Item URI prefixes (empty: all items)
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            store: StoreConfig::default(),
            externalizer: ExternalizerConfig::default(),
            publisher: PublisherConfig::default(),
            destinations: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("pressroom.db")
}

impl From<&DestinationConfig> for Destination {
    fn from(config: &DestinationConfig) -> Self {
        let mut destination = Destination::new(&config.name, &config.root);
        destination.prefixes = config.prefixes.clone();
        destination
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.externalizer.validate().map_err(CliError::Config)?;
        self.publisher.validate().map_err(CliError::Config)?;

        let mut names = HashSet::new();
        for destination in &self.destinations {
            if destination.name.trim().is_empty() {
                return Err(CliError::Config("Destination name must not be empty".into()));
            }
            if destination.root.as_os_str().is_empty() {
                return Err(CliError::Config(format!(
                    "Destination '{}' has no root",
                    destination.name
                )));
            }
            if !names.insert(destination.name.as_str()) {
                return Err(CliError::Config(format!(
                    "Duplicate destination '{}'",
                    destination.name
                )));
            }
        }
        Ok(())
    }

    /// Destinations as domain values
    pub fn destinations(&self) -> Vec<Destination> {
        self.destinations.iter().map(Destination::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.store.path, PathBuf::from("pressroom.db"));
        assert_eq!(config.externalizer, ExternalizerConfig::default());
        assert_eq!(config.publisher, PublisherConfig::default());
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config = Config::parse(
            r#"
            log_level = "debug"

            [store]
            path = "/var/lib/pressroom/store.db"

            [externalizer]
            max_depth = 8
            publish_standalone = true

            [publisher]
            startup_delay_secs = 0
            dry_run = true

            [[destinations]]
            name = "web"
            root = "/srv/web"

            [[destinations]]
            name = "docs"
            root = "/srv/docs"
            prefixes = ["guides/"]
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.externalizer.max_depth, 8);
        assert!(config.externalizer.publish_standalone);
        assert!(config.publisher.dry_run);
        assert_eq!(config.publisher.max_sleep_secs, PublisherConfig::default().max_sleep_secs);

        let destinations = config.destinations();
        assert_eq!(destinations.len(), 2);
        assert_eq!(destinations[1].name, "docs");
        assert_eq!(destinations[1].prefixes, vec!["guides/".to_string()]);
    }

    #[test]
    fn test_duplicate_destination_rejected() {
        let result = Config::parse(
            r#"
            [[destinations]]
            name = "web"
            root = "/a"

            [[destinations]]
            name = "web"
            root = "/b"
            "#,
        );
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("Duplicate")));
    }

    #[test]
    fn test_invalid_engine_config_rejected() {
        let result = Config::parse("[externalizer]\nmax_depth = 0\n");
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pressroom.toml");
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().log_level, "warn");

        let missing = Config::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(CliError::Config(_))));
    }
}
