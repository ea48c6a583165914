//! Derive bookable slots from weekly availability and booked sessions.
//!
//! Booked sessions are never written back into the weekly availability; they
//! are subtracted at read time for each calendar date in the requested range.
//! The residual free time is cut into fixed-size chunks, and chunks can then
//! be combined into longer sessions when a student picks a duration.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AvailabilityError, Result, SlotRejection};
use crate::interval::{Interval, WeeklyAvailability};
use crate::selection::Granularity;
use crate::time::{TimeOfDay, Weekday, MINUTES_PER_DAY};

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// The Monday-to-Sunday week containing `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        let offset = u64::from(date.weekday().num_days_from_monday());
        let monday = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
        let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
        Self::new(monday, sunday)
    }

    /// Dates in order. Yields nothing when `end < start`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// A session already booked with the tutor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSession")]
pub struct BookedSession {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    start_time: String,
    end_time: String,
}

impl TryFrom<RawSession> for BookedSession {
    type Error = AvailabilityError;

    fn try_from(raw: RawSession) -> Result<Self> {
        BookedSession::parse(&raw.start_time, &raw.end_time)
    }
}

impl BookedSession {
    pub fn new(start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self { start_time, end_time }
    }

    /// Parse a pair of ISO-8601 datetimes. Inverted or empty sessions are errors.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start_time = parse_datetime(start)?;
        let end_time = parse_datetime(end)?;
        if end_time <= start_time {
            return Err(AvailabilityError::InvalidDateTime(format!(
                "session ends at {end} before it starts at {start}"
            )));
        }
        Ok(Self { start_time, end_time })
    }

    /// The part of this session falling on `date`, as a time-of-day interval.
    ///
    /// Sessions crossing midnight contribute to each date they touch. A
    /// partial trailing minute is rounded up so it still blocks.
    pub fn interval_on(&self, date: NaiveDate) -> Option<Interval> {
        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = date.succ_opt()?.and_time(NaiveTime::MIN);
        if self.end_time <= day_start || self.start_time >= day_end {
            return None;
        }

        let start = if self.start_time <= day_start {
            TimeOfDay::MIDNIGHT
        } else {
            TimeOfDay::from_naive_time(self.start_time.time())
        };
        let end = if self.end_time >= day_end {
            TimeOfDay::LAST_MINUTE
        } else {
            let time = self.end_time.time();
            let whole = TimeOfDay::from_naive_time(time);
            if time.second() > 0 || time.nanosecond() > 0 {
                TimeOfDay::saturating(u32::from(whole.minutes()) + 1)
            } else {
                whole
            }
        };
        Interval::new(start, end)
    }
}

/// Parse an ISO-8601 datetime into naive wall time.
///
/// Accepts RFC 3339 with an offset (the offset is dropped and the local wall
/// time kept) and naive `YYYY-MM-DDTHH:MM[:SS[.fff]]`.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| AvailabilityError::InvalidDateTime(format!("'{s}': {e}")))
}

/// A date-anchored candidate (or chosen) session time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSlot {
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub available: bool,
    pub tutor_id: String,
    pub duration_minutes: u32,
}

impl BookingSlot {
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start.to_naive_time())
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end.to_naive_time())
    }
}

/// What to derive: whose slots, over which dates, at which chunk size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotQuery {
    pub tutor_id: String,
    pub range: DateRange,
    pub granularity: Granularity,
    /// Slots starting before this instant are not offered.
    pub not_before: Option<NaiveDateTime>,
}

impl SlotQuery {
    pub fn new(tutor_id: impl Into<String>, range: DateRange, granularity: Granularity) -> Self {
        Self {
            tutor_id: tutor_id.into(),
            range,
            granularity,
            not_before: None,
        }
    }

    pub fn not_before(mut self, now: NaiveDateTime) -> Self {
        self.not_before = Some(now);
        self
    }
}

/// Produce the bookable chunks for `query`.
///
/// For each date, the booked sessions falling on it are subtracted from that
/// weekday's availability, and each residual interval is cut into
/// `granularity`-sized chunks starting at the interval's start. A trailing
/// piece shorter than one chunk is dropped.
pub fn derive_slots(
    weekly: &WeeklyAvailability,
    booked: &[BookedSession],
    query: &SlotQuery,
) -> Vec<BookingSlot> {
    let step = u32::from(query.granularity.minutes());
    let mut slots = Vec::new();

    for date in query.range.days() {
        let day = weekly.day(Weekday::of_date(date));
        if day.is_empty() {
            continue;
        }

        let blocked: Vec<Interval> = booked.iter().filter_map(|s| s.interval_on(date)).collect();
        let free = day.subtract(&blocked);

        for interval in &free {
            for chunk in chunks(*interval, step) {
                if let Some(now) = query.not_before {
                    if date.and_time(chunk.start.to_naive_time()) < now {
                        continue;
                    }
                }
                slots.push(BookingSlot {
                    date,
                    start: chunk.start,
                    end: chunk.end,
                    available: true,
                    tutor_id: query.tutor_id.clone(),
                    duration_minutes: step,
                });
            }
        }
    }

    debug!(
        tutor = %query.tutor_id,
        from = %query.range.start,
        to = %query.range.end,
        count = slots.len(),
        "derived slots"
    );
    slots
}

/// Cut `interval` into consecutive `step`-minute pieces, dropping any remainder.
///
/// An interval ending at 23:59 runs to the end of the day, matching the last
/// editor cell; the chunk that reaches midnight ends at 23:59.
fn chunks(interval: Interval, step: u32) -> impl Iterator<Item = Interval> {
    let start = u32::from(interval.start.minutes());
    let end = if interval.end == TimeOfDay::LAST_MINUTE {
        u32::from(MINUTES_PER_DAY)
    } else {
        u32::from(interval.end.minutes())
    };
    let count = if step == 0 { 0 } else { (end - start) / step };
    (0..count).filter_map(move |i| {
        let s = TimeOfDay::new((start + i * step) as u16)?;
        let e = TimeOfDay::saturating(start + (i + 1) * step);
        Some(Interval { start: s, end: e })
    })
}

/// Every slot of `duration_minutes` that can be formed from consecutive
/// available chunks on the same date.
///
/// A slot uses `ceil(duration / chunk length)` chunks, each ending exactly
/// where the next starts. It spans from the first chunk's start to the last
/// chunk's end.
pub fn combine_consecutive(chunks: &[BookingSlot], duration_minutes: u32) -> Vec<BookingSlot> {
    if duration_minutes == 0 {
        return Vec::new();
    }

    let mut sorted: Vec<&BookingSlot> = chunks
        .iter()
        .filter(|c| c.available && c.duration_minutes > 0)
        .collect();
    sorted.sort_by_key(|c| (c.date, c.start));

    let mut combined = Vec::new();
    for (i, first) in sorted.iter().enumerate() {
        let needed = duration_minutes.div_ceil(first.duration_minutes) as usize;
        let Some(run) = sorted.get(i..i + needed) else {
            continue;
        };
        let contiguous = run
            .windows(2)
            .all(|w| w[0].date == w[1].date && w[0].end == w[1].start);
        if !contiguous {
            continue;
        }

        let last = run[needed - 1];
        combined.push(BookingSlot {
            date: first.date,
            start: first.start,
            end: last.end,
            available: true,
            tutor_id: first.tutor_id.clone(),
            duration_minutes: run.iter().map(|c| c.duration_minutes).sum(),
        });
    }

    combined
}

/// Start times on `date` from which a `duration_minutes` session fits.
pub fn valid_start_times(
    chunks: &[BookingSlot],
    date: NaiveDate,
    duration_minutes: u32,
) -> Vec<TimeOfDay> {
    let on_date: Vec<BookingSlot> = chunks.iter().filter(|c| c.date == date).cloned().collect();
    combine_consecutive(&on_date, duration_minutes)
        .into_iter()
        .map(|slot| slot.start)
        .collect()
}

/// The combined slot starting at `start` on `date`, or the reason it cannot
/// be offered.
pub fn select_slot(
    chunks: &[BookingSlot],
    date: NaiveDate,
    start: TimeOfDay,
    duration_minutes: u32,
) -> std::result::Result<BookingSlot, SlotRejection> {
    if duration_minutes == 0 {
        return Err(SlotRejection::InvalidDuration);
    }
    let on_date: Vec<BookingSlot> = chunks.iter().filter(|c| c.date == date).cloned().collect();
    combine_consecutive(&on_date, duration_minutes)
        .into_iter()
        .find(|slot| slot.start == start)
        .ok_or(SlotRejection::UnavailableStart {
            date,
            start,
            duration_minutes,
        })
}
