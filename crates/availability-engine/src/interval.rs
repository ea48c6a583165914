//! Half-open time intervals and the canonical per-day / per-week containers.
//!
//! A day's availability is kept sorted by start, with no two intervals
//! overlapping or touching: for consecutive `a, b`, `a.end < b.start`.
//! [`normalize`] is the only way to build a [`DayAvailability`] from outside
//! this module, so the invariant cannot be broken by callers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::{TimeOfDay, Weekday};

/// A `[start, end)` range of wall-clock minutes within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Interval {
    /// Returns `None` for zero-length or inverted ranges.
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_minutes(&self) -> u32 {
        u32::from(self.end.minutes().saturating_sub(self.start.minutes()))
    }

    /// True when `t` is inside the interval; the end boundary is excluded.
    pub fn contains(&self, t: TimeOfDay) -> bool {
        self.start <= t && t < self.end
    }

    /// Strict overlap. Intervals that only touch (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when the intervals overlap or share a boundary, i.e. they would
    /// merge under [`normalize`].
    pub fn touches_or_overlaps(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Two intervals overlap when `a.start < b.end && b.start < a.end`.
pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    a.overlaps(b)
}

/// Sort and merge intervals into the canonical form.
///
/// Overlapping and touching intervals collapse into one (keeping the larger
/// end), duplicates disappear, and zero-length or inverted entries are dropped.
pub fn normalize(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.iter().copied().filter(Interval::is_valid).collect();
    if sorted.is_empty() {
        return sorted;
    }

    sorted.sort_by_key(|iv| (iv.start, iv.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for iv in sorted {
        if let Some(last) = merged.last_mut() {
            if iv.start <= last.end {
                last.end = last.end.max(iv.end);
                continue;
            }
        }
        merged.push(iv);
    }

    merged
}

/// Remove every minute covered by `remove` from `base`.
///
/// Both inputs may be in any order and may overlap; the result is canonical.
/// Each base interval splits into zero, one or more residual pieces.
pub fn subtract(base: &[Interval], remove: &[Interval]) -> Vec<Interval> {
    let base = normalize(base);
    let remove = normalize(remove);
    if remove.is_empty() {
        return base;
    }

    let mut result = Vec::with_capacity(base.len() + remove.len());
    let mut ri = 0;

    for b in base {
        let mut cursor = b.start;

        // Removal ranges ending before this interval can never matter again.
        while ri < remove.len() && remove[ri].end <= cursor {
            ri += 1;
        }

        let mut j = ri;
        while j < remove.len() && remove[j].start < b.end {
            let r = remove[j];
            if r.start > cursor {
                result.push(Interval { start: cursor, end: r.start });
            }
            cursor = cursor.max(r.end);
            j += 1;
        }

        if cursor < b.end {
            result.push(Interval { start: cursor, end: b.end });
        }
    }

    result
}

/// Sum of the lengths of `intervals`, counting overlapping minutes once.
pub fn total_minutes(intervals: &[Interval]) -> u32 {
    normalize(intervals).iter().map(Interval::duration_minutes).sum()
}

/// The canonical availability of one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DayAvailability(Vec<Interval>);

impl DayAvailability {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build from arbitrary intervals; the result is normalized.
    pub fn from_intervals(intervals: &[Interval]) -> Self {
        Self(normalize(intervals))
    }

    /// Wrap intervals that are already canonical (e.g. residuals of a
    /// subtraction from a canonical list).
    pub(crate) fn from_canonical(intervals: Vec<Interval>) -> Self {
        debug_assert!(
            intervals.windows(2).all(|w| w[0].end < w[1].start)
                && intervals.iter().all(Interval::is_valid),
            "intervals are not canonical: {intervals:?}"
        );
        Self(intervals)
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when some interval's `[start, end)` contains `t`.
    pub fn contains_time(&self, t: TimeOfDay) -> bool {
        // Sorted and disjoint: only the last interval starting at or before t can contain it.
        let idx = self.0.partition_point(|iv| iv.start <= t);
        idx > 0 && self.0[idx - 1].contains(t)
    }

    /// True when `[start, end)` lies entirely inside one interval.
    pub fn covers(&self, span: &Interval) -> bool {
        self.0.iter().any(|iv| iv.start <= span.start && span.end <= iv.end)
    }

    /// First existing interval strictly overlapping `candidate`.
    pub fn first_overlap(&self, candidate: &Interval) -> Option<Interval> {
        self.0.iter().copied().find(|iv| iv.overlaps(candidate))
    }

    pub fn total_minutes(&self) -> u32 {
        self.0.iter().map(Interval::duration_minutes).sum()
    }

    /// Set difference with `remove`.
    pub fn subtract(&self, remove: &[Interval]) -> DayAvailability {
        Self::from_canonical(subtract(&self.0, remove))
    }
}

impl<'a> IntoIterator for &'a DayAvailability {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A tutor's recurring weekly availability: one canonical list per weekday.
///
/// Values are treated as immutable snapshots; edits return a new value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeeklyAvailability {
    days: [DayAvailability; 7],
}

impl WeeklyAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn day(&self, day: Weekday) -> &DayAvailability {
        &self.days[day.index()]
    }

    /// A copy of this week with `day` replaced.
    pub fn with_day(&self, day: Weekday, availability: DayAvailability) -> Self {
        let mut next = self.clone();
        next.days[day.index()] = availability;
        next
    }

    /// Replace `day` in place.
    pub fn set_day(&mut self, day: Weekday, availability: DayAvailability) {
        self.days[day.index()] = availability;
    }

    /// Days in Monday-first order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &DayAvailability)> {
        Weekday::ALL.into_iter().zip(self.days.iter())
    }

    pub fn total_minutes(&self) -> u32 {
        self.days.iter().map(DayAvailability::total_minutes).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(DayAvailability::is_empty)
    }
}

impl FromIterator<(Weekday, Interval)> for WeeklyAvailability {
    /// Collect `(day, interval)` pairs; each day is normalized once at the end.
    fn from_iter<T: IntoIterator<Item = (Weekday, Interval)>>(iter: T) -> Self {
        let mut raw: [Vec<Interval>; 7] = Default::default();
        for (day, interval) in iter {
            raw[day.index()].push(interval);
        }
        let mut weekly = Self::new();
        for (day, intervals) in Weekday::ALL.into_iter().zip(raw.iter()) {
            weekly.set_day(day, DayAvailability::from_intervals(intervals));
        }
        weekly
    }
}
