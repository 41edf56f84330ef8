//! Output formatting for the CLI.

use crate::cli::CliFormat;
use crate::error::Result;
use pressroom_domain::{ExternalFile, Instant, IntervalEnd};
use pressroom_publisher::{TickReport, TimerState};
use serde_json::json;

/// Output formatter.
pub struct Formatter {
    format: CliFormat,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: CliFormat) -> Self {
        Self { format }
    }

    /// Format artifacts produced by an externalization.
    pub fn format_artifacts(&self, artifacts: &[ExternalFile]) -> Result<String> {
        match self.format {
            CliFormat::Json => {
                let rows: Vec<serde_json::Value> = artifacts
                    .iter()
                    .map(|a| {
                        json!({
                            "id": a.id.to_string(),
                            "item": a.item.as_str(),
                            "source_version": a.source_version.to_string(),
                            "from": a.interval.from(),
                            "to": match a.interval.to() {
                                IntervalEnd::Finite(t) => json!(t),
                                IntervalEnd::Infinite => serde_json::Value::Null,
                            },
                            "identity": a.identity,
                            "state": a.state.as_str(),
                            "bytes": a.content.len(),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&rows)?)
            }
            CliFormat::Text => {
                if artifacts.is_empty() {
                    return Ok("No artifacts produced.".to_string());
                }
                let lines: Vec<String> = artifacts
                    .iter()
                    .map(|a| {
                        format!(
                            "{}  {}  {}  {} bytes  {}",
                            a.id,
                            a.item,
                            a.interval,
                            a.content.len(),
                            a.state.as_str()
                        )
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format the timer table.
    pub fn format_timetable(&self, timers: &[(Instant, TimerState)]) -> Result<String> {
        match self.format {
            CliFormat::Json => {
                let rows: Vec<serde_json::Value> = timers
                    .iter()
                    .map(|(at, state)| json!({ "instant": at, "state": state.to_string() }))
                    .collect();
                Ok(serde_json::to_string_pretty(&rows)?)
            }
            CliFormat::Text => {
                if timers.is_empty() {
                    return Ok("No publish instants.".to_string());
                }
                let lines: Vec<String> = timers
                    .iter()
                    .map(|(at, state)| format!("{}  {}", at.to_rfc3339(), state))
                    .collect();
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format the outcome of a publish tick.
    pub fn format_tick(&self, report: &TickReport) -> Result<String> {
        match self.format {
            CliFormat::Json => {
                let destinations: Vec<serde_json::Value> = report
                    .destinations
                    .iter()
                    .map(|(name, d)| {
                        json!({
                            "name": name,
                            "written": d.written,
                            "unchanged": d.unchanged,
                            "deleted": d.deleted,
                            "pruned": d.pruned,
                            "skipped": d.skipped,
                            "failures": d.failures.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                let value = json!({
                    "instant": report.instant,
                    "artifacts": report.artifacts,
                    "destinations": destinations,
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            CliFormat::Text => {
                let mut lines = vec![format!(
                    "Published {} artifacts at {}",
                    report.artifacts,
                    report
                        .instant
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string())
                )];
                for (name, d) in &report.destinations {
                    lines.push(format!(
                        "  {}: {} written, {} unchanged, {} deleted, {} pruned, {} failed",
                        name,
                        d.written,
                        d.unchanged,
                        d.deleted,
                        d.pruned,
                        d.failures.len()
                    ));
                    for failure in &d.failures {
                        lines.push(format!("    {}", failure));
                    }
                }
                Ok(lines.join("\n"))
            }
        }
    }
}
