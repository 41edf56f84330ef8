//! Externalize command implementation.

use super::open_store;
use crate::cli::ExternalizeArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use pressroom_domain::VersionId;
use pressroom_externalizer::{Externalizer, ExternalizerService};

/// Parse version ids given on the command line.
pub fn parse_ids(ids: &[String]) -> Result<Vec<VersionId>> {
    ids.iter()
        .map(|id| {
            VersionId::from_string(id.trim())
                .map_err(|e| CliError::InvalidInput(format!("'{}': {}", id, e)))
        })
        .collect()
}

/// Execute the externalize command.
///
/// Every id is queued before any result is awaited; the first failure is
/// returned after all artifacts that did render are printed.
pub async fn execute_externalize(
    args: ExternalizeArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let ids = parse_ids(&args.ids)?;
    let store = open_store(config)?;
    let service = ExternalizerService::start(Externalizer::new(store, config.externalizer.clone()));

    let handles: Vec<_> = ids.into_iter().map(|id| service.externalize_async(id)).collect();
    let mut artifacts = Vec::new();
    let mut first_error = None;
    for handle in handles {
        let version_id = handle.version_id();
        match handle.wait().await {
            Ok(files) => artifacts.extend(files.iter().cloned()),
            Err(e) => {
                tracing::error!(version_id = %version_id, "Externalization failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }
    service.shutdown().await;
    tracing::info!(
        artifacts = artifacts.len(),
        "No scheduler attached; a running pressroom rearms at its next reschedule"
    );

    println!("{}", formatter.format_artifacts(&artifacts)?);
    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids() {
        let id = VersionId::new();
        let parsed = parse_ids(&[format!(" {} ", id)]).unwrap();
        assert_eq!(parsed, vec![id]);

        let err = parse_ids(&["not-a-uuid".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(msg) if msg.contains("not-a-uuid")));
    }
}
