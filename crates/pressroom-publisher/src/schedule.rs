//! Publish schedule and timer table
//!
//! The schedule is every distinct boundary of every live artifact's
//! interval. It is derived from the artifact store and never persisted. The
//! timer table records, per instant, where that instant's timer is in its
//! lifecycle:
//!
//! ```text
//! Unarmed → Armed → Fired → (re-Armed | Cancelled)
//! ```

use chrono::Utc;
use pressroom_domain::{ExternalFile, Instant};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Lifecycle of one timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerState {
    /// Known but not waiting to fire
    Unarmed,
    /// Waiting for its instant
    Armed,
    /// Reconciliation ran for this instant
    Fired,
    /// Replaced by a reschedule before firing
    Cancelled,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerState::Unarmed => "unarmed",
            TimerState::Armed => "armed",
            TimerState::Fired => "fired",
            TimerState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Distinct `from` and finite `to` instants of every non-deleted artifact
pub fn derive_schedule(artifacts: &[ExternalFile]) -> BTreeSet<Instant> {
    artifacts
        .iter()
        .filter(|a| !a.deleted)
        .flat_map(|a| [Some(a.interval.from()), a.interval.to().instant()])
        .flatten()
        .collect()
}

/// Timer table keyed by wall-clock instant
#[derive(Debug, Default)]
pub struct Timetable {
    timers: BTreeMap<Instant, TimerState>,
    rescheduled: bool,
}

impl Timetable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// True once [`Timetable::rearm`] has run
    pub fn has_run(&self) -> bool {
        self.rescheduled
    }

    /// Replace every armed timer with one per instant in `schedule` at or
    /// after `now`
    ///
    /// History from before the previous reschedule is dropped, armed timers
    /// not re-armed become cancelled. Armed timers already due stay armed
    /// until [`Timetable::take_due`] collects them. Returns the number of
    /// armed timers.
    pub fn rearm(&mut self, schedule: &BTreeSet<Instant>, now: Instant) -> usize {
        self.timers.retain(|_, state| *state == TimerState::Armed);
        for (instant, state) in self.timers.iter_mut() {
            if *instant > now {
                *state = TimerState::Cancelled;
            }
        }
        for &instant in schedule.range(now..) {
            self.timers.insert(instant, TimerState::Armed);
        }
        for &instant in schedule.range(..now) {
            self.timers.entry(instant).or_insert(TimerState::Unarmed);
        }
        self.rescheduled = true;
        self.armed_count()
    }

    /// Earliest armed instant
    pub fn next_armed(&self) -> Option<Instant> {
        self.timers
            .iter()
            .find(|(_, state)| **state == TimerState::Armed)
            .map(|(instant, _)| *instant)
    }

    /// Mark every armed instant at or before `now` as fired, returning them
    /// in ascending order
    pub fn take_due(&mut self, now: Instant) -> Vec<Instant> {
        let mut due = Vec::new();
        for (instant, state) in self.timers.range_mut(..=now) {
            if *state == TimerState::Armed {
                *state = TimerState::Fired;
                due.push(*instant);
            }
        }
        due
    }

    /// Mark a manually triggered instant as fired
    pub fn mark_fired(&mut self, instant: Instant) {
        self.timers.insert(instant, TimerState::Fired);
    }

    /// State of the timer for `instant`
    pub fn state(&self, instant: Instant) -> Option<TimerState> {
        self.timers.get(&instant).copied()
    }

    /// Number of armed timers
    pub fn armed_count(&self) -> usize {
        self.timers
            .values()
            .filter(|s| **s == TimerState::Armed)
            .count()
    }

    /// Snapshot of every timer in instant order
    pub fn entries(&self) -> Vec<(Instant, TimerState)> {
        self.timers.iter().map(|(i, s)| (*i, *s)).collect()
    }
}

/// Time until `at`, zero when it has passed
pub(crate) fn until(at: Instant) -> std::time::Duration {
    (at - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO)
}
