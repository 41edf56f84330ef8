//! Publish command implementation.

use super::open_store;
use crate::cli::PublishArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use chrono::{DateTime, Utc};
use pressroom_domain::Instant;
use pressroom_publisher::PublishScheduler;
use std::sync::Arc;

/// Parse `--at`, defaulting to now.
pub fn parse_instant(at: Option<&str>) -> Result<Instant> {
    match at {
        None => Ok(Utc::now()),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| CliError::InvalidInput(format!("Invalid instant '{}': {}", text, e))),
    }
}

/// Execute the publish command.
pub async fn execute_publish(args: PublishArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let instant = parse_instant(args.at.as_deref())?;
    let mut publisher = config.publisher.clone();
    publisher.dry_run |= args.dry_run;

    let store = open_store(config)?;
    let scheduler = PublishScheduler::new(store, Arc::new(config.destinations()), publisher);
    let report = scheduler.publish_at(instant).await?;

    println!("{}", formatter.format_tick(&report)?);
    if report.failure_count() > 0 {
        tracing::warn!(failures = report.failure_count(), "Publish finished with failures");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_instant() {
        let parsed = parse_instant(Some("2026-05-01T02:00:00+02:00")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap());

        assert!(parse_instant(None).is_ok());
        assert!(matches!(
            parse_instant(Some("tomorrow")),
            Err(CliError::InvalidInput(_))
        ));
    }
}
