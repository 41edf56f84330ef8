//! Schedule command implementation.

use super::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use chrono::Utc;
use pressroom_publisher::{PublishScheduler, Timetable};
use std::sync::Arc;

/// Execute the schedule command.
///
/// Prints every publish instant; past ones show as unarmed.
pub fn execute_schedule(config: &Config, formatter: &Formatter) -> Result<()> {
    let store = open_store(config)?;
    let scheduler = PublishScheduler::new(
        store,
        Arc::new(config.destinations()),
        config.publisher.clone(),
    );

    let schedule = scheduler.schedule()?;
    let mut timetable = Timetable::new();
    let armed = timetable.rearm(&schedule, Utc::now());
    tracing::debug!(instants = schedule.len(), armed, "Derived publish schedule");

    println!("{}", formatter.format_timetable(&timetable.entries())?);
    Ok(())
}
