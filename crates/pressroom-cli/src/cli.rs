//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pressroom - render versioned content and publish it on schedule.
#[derive(Debug, Parser)]
#[command(name = "pressroom")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "PRESSROOM_CONFIG", default_value = "pressroom.toml")]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "text")]
    pub format: CliFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Human-readable text (default)
    Text,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the publish scheduler, externalizing version ids read from stdin
    Run,

    /// Externalize one or more versions and print the resulting artifacts
    ///
    /// This command runs its own engine with no publish scheduler attached.
    /// A `pressroom run` process already serving the same store rearms its
    /// timers for the new artifacts only at its next reschedule, which
    /// happens when it externalizes something itself or restarts.
    Externalize(ExternalizeArgs),

    /// Print the publish timetable derived from the stored artifacts
    Schedule,

    /// Reconcile every destination once
    Publish(PublishArgs),
}

/// Arguments for the externalize command.
#[derive(Debug, Parser)]
pub struct ExternalizeArgs {
    /// Version ids (UUID)
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Arguments for the publish command.
#[derive(Debug, Parser)]
pub struct PublishArgs {
    /// Instant to publish at (RFC 3339, default: now)
    #[arg(long)]
    pub at: Option<String>,

    /// Only report what would change
    #[arg(long)]
    pub dry_run: bool,
}
