//! Half-open validity intervals
//!
//! An [`Interval`] is `[from, to)`: `from` is inclusive, `to` is exclusive or
//! infinite. Every interval is non-empty; construction rejects `from >= to`.

use crate::ValidationError;
use chrono::{DateTime, Utc};
use std::cmp::{max, min};
use std::fmt;

/// A wall-clock instant
pub type Instant = DateTime<Utc>;

/// Exclusive end of an interval
///
/// `Infinite` orders after every finite instant, so derived ordering gives
/// the comparison the interval algebra needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntervalEnd {
    /// Ends just before this instant
    Finite(Instant),
    /// Never ends
    Infinite,
}

impl IntervalEnd {
    /// The finite instant, if any
    pub fn instant(&self) -> Option<Instant> {
        match self {
            IntervalEnd::Finite(t) => Some(*t),
            IntervalEnd::Infinite => None,
        }
    }

    /// True if `t` lies strictly before this end
    pub fn is_after(&self, t: Instant) -> bool {
        match self {
            IntervalEnd::Finite(end) => t < *end,
            IntervalEnd::Infinite => true,
        }
    }
}

impl From<Instant> for IntervalEnd {
    fn from(t: Instant) -> Self {
        IntervalEnd::Finite(t)
    }
}

impl From<Option<Instant>> for IntervalEnd {
    fn from(t: Option<Instant>) -> Self {
        t.map_or(IntervalEnd::Infinite, IntervalEnd::Finite)
    }
}

/// Half-open time range `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    from: Instant,
    to: IntervalEnd,
}

impl Interval {
    /// Create a new interval
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyInterval`] when `from >= to`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use pressroom_domain::{Interval, IntervalEnd};
    ///
    /// let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    /// assert!(Interval::new(t, IntervalEnd::Finite(t)).is_err());
    /// assert!(Interval::new(t, IntervalEnd::Infinite).is_ok());
    /// ```
    pub fn new(from: Instant, to: impl Into<IntervalEnd>) -> Result<Self, ValidationError> {
        let to = to.into();
        if !to.is_after(from) {
            return Err(ValidationError::EmptyInterval {
                from: from.to_rfc3339(),
                to: to.instant().map(|t| t.to_rfc3339()).unwrap_or_else(|| "inf".to_string()),
            });
        }
        Ok(Self { from, to })
    }

    /// Bounded interval `[from, to)`
    pub fn bounded(from: Instant, to: Instant) -> Result<Self, ValidationError> {
        Self::new(from, IntervalEnd::Finite(to))
    }

    /// Open-ended interval `[from, inf)`, always valid
    pub fn starting_at(from: Instant) -> Self {
        Self {
            from,
            to: IntervalEnd::Infinite,
        }
    }

    /// Inclusive start
    pub fn from(&self) -> Instant {
        self.from
    }

    /// Exclusive end
    pub fn to(&self) -> IntervalEnd {
        self.to
    }

    /// True if the interval never ends
    pub fn is_infinite(&self) -> bool {
        self.to == IntervalEnd::Infinite
    }

    /// True iff `self.from < other.to && other.from < self.to`
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.to.is_after(other.from) && other.to.is_after(self.from)
    }

    /// `[max(from), min(to))`, or `None` when the intervals are disjoint
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Interval {
            from: max(self.from, other.from),
            to: min(self.to, other.to),
        })
    }

    /// True if `t` lies within `[from, to)`
    pub fn contains(&self, t: Instant) -> bool {
        self.from <= t && self.to.is_after(t)
    }

    /// True if `other` lies entirely within `self`
    pub fn encloses(&self, other: &Interval) -> bool {
        self.from <= other.from && other.to <= self.to
    }

    /// The parts of `self` not covered by `other`, in time order
    ///
    /// Yields zero, one or two intervals.
    pub fn subtract(&self, other: &Interval) -> Vec<Interval> {
        if !self.overlaps(other) {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(2);
        if self.from < other.from {
            pieces.push(Interval {
                from: self.from,
                to: IntervalEnd::Finite(other.from),
            });
        }
        if let IntervalEnd::Finite(cut) = other.to {
            if self.to.is_after(cut) {
                pieces.push(Interval {
                    from: cut,
                    to: self.to,
                });
            }
        }
        pieces
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to {
            IntervalEnd::Finite(to) => write!(f, "[{}, {})", self.from.to_rfc3339(), to.to_rfc3339()),
            IntervalEnd::Infinite => write!(f, "[{}, inf)", self.from.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> Instant {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn days(n: i64) -> Instant {
        t0() + Duration::days(n)
    }

    #[test]
    fn test_rejects_empty_and_inverted() {
        assert!(Interval::bounded(days(0), days(0)).is_err());
        assert!(Interval::bounded(days(5), days(1)).is_err());
        assert!(Interval::bounded(days(0), days(1)).is_ok());
    }

    #[test]
    fn test_adjacent_intervals_do_not_overlap() {
        let a = Interval::bounded(days(0), days(10)).unwrap();
        let b = Interval::bounded(days(10), days(20)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_intersection_with_infinite() {
        let a = Interval::bounded(days(-1000), days(10)).unwrap();
        let b = Interval::starting_at(days(0));
        let i = a.intersection(&b).unwrap();
        assert_eq!(i.from(), days(0));
        assert_eq!(i.to(), IntervalEnd::Finite(days(10)));

        let both = Interval::starting_at(days(3)).intersection(&b).unwrap();
        assert!(both.is_infinite());
        assert_eq!(both.from(), days(3));
    }

    #[test]
    fn test_contains_is_half_open() {
        let a = Interval::bounded(days(0), days(10)).unwrap();
        assert!(a.contains(days(0)));
        assert!(a.contains(days(9)));
        assert!(!a.contains(days(10)));
        assert!(Interval::starting_at(days(0)).contains(days(100_000)));
    }

    #[test]
    fn test_infinite_end_orders_last() {
        assert!(IntervalEnd::Finite(days(1_000_000)) < IntervalEnd::Infinite);
    }

    #[test]
    fn test_subtract_splits_around_inner_range() {
        let outer = Interval::starting_at(days(0));
        let inner = Interval::bounded(days(5), days(10)).unwrap();
        assert_eq!(
            outer.subtract(&inner),
            vec![
                Interval::bounded(days(0), days(5)).unwrap(),
                Interval::starting_at(days(10)),
            ]
        );
        assert!(inner.subtract(&outer).is_empty());

        let disjoint = Interval::bounded(days(20), days(30)).unwrap();
        assert_eq!(inner.subtract(&disjoint), vec![inner]);
    }

    #[test]
    fn test_display() {
        let a = Interval::starting_at(t0());
        assert!(a.to_string().ends_with(", inf)"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn instant(offset: i64) -> Instant {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::hours(offset)
    }

    fn arb_interval() -> impl Strategy<Value = Interval> {
        (-500i64..500, prop::option::of(1i64..500)).prop_map(|(start, len)| match len {
            Some(len) => Interval::bounded(instant(start), instant(start + len)).unwrap(),
            None => Interval::starting_at(instant(start)),
        })
    }

    proptest! {
        /// Property: overlap is symmetric
        #[test]
        fn test_overlap_symmetric(a in arb_interval(), b in arb_interval()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        /// Property: intersection exists exactly when intervals overlap and lies within both
        #[test]
        fn test_intersection_within_operands(a in arb_interval(), b in arb_interval()) {
            match a.intersection(&b) {
                Some(i) => {
                    prop_assert!(a.overlaps(&b));
                    prop_assert!(a.encloses(&i));
                    prop_assert!(b.encloses(&i));
                    prop_assert_eq!(Some(i), b.intersection(&a));
                }
                None => prop_assert!(!a.overlaps(&b)),
            }
        }

        /// Property: subtraction leaves disjoint pieces inside `a` and outside `b`
        #[test]
        fn test_subtract_pieces_avoid_other(a in arb_interval(), b in arb_interval()) {
            let pieces = a.subtract(&b);
            for piece in &pieces {
                prop_assert!(a.encloses(piece));
                prop_assert!(!piece.overlaps(&b));
            }
            for pair in pieces.windows(2) {
                prop_assert!(!pair[0].overlaps(&pair[1]));
            }
        }

        /// Property: zero-length and inverted intervals never construct
        #[test]
        fn test_non_positive_length_rejected(start in -500i64..500, back in 0i64..500) {
            prop_assert!(Interval::bounded(instant(start), instant(start - back)).is_err());
        }
    }
}
