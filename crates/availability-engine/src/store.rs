//! Persistence seam and the `Scheduler` facade.
//!
//! The engine never talks to a database itself. Callers construct a store
//! implementing [`AvailabilityStore`] and [`SessionStore`] once and hand it to
//! a [`Scheduler`]; tests hand it an [`InMemoryStore`] instead.
//!
//! Availability is saved wholesale. Without an expected version the last
//! write wins; with one, a stale save fails with
//! [`StoreError::VersionConflict`]. Exclusivity of a booked slot is decided by
//! the store at confirmation time, never by the engine.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{AvailabilityError, SlotRejection};
use crate::interval::WeeklyAvailability;
use crate::slots::{self, BookedSession, BookingSlot, DateRange, SlotQuery};
use crate::time::TimeOfDay;
use crate::wire;

/// A stored value together with its save counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("availability for {tutor_id} changed (expected version {expected}, found {actual})")]
    VersionConflict {
        tutor_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("slot {date} {start}-{end} is no longer available")]
    SlotTaken {
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
    },

    #[error("stored data could not be decoded: {0}")]
    Codec(#[from] AvailabilityError),

    #[error(transparent)]
    Rejected(#[from] SlotRejection),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Where weekly availability lives.
pub trait AvailabilityStore {
    /// The tutor's saved week, or `None` if they never saved one.
    fn load(&self, tutor_id: &str) -> Result<Option<Versioned<WeeklyAvailability>>>;

    /// Overwrite the tutor's week and return the new version.
    ///
    /// `expected_version` of `Some(v)` fails unless the stored version is `v`
    /// (0 for a tutor with nothing saved).
    fn save(
        &mut self,
        tutor_id: &str,
        weekly: &WeeklyAvailability,
        expected_version: Option<u64>,
    ) -> Result<u64>;
}

/// Where booked sessions live.
pub trait SessionStore {
    /// Sessions of the tutor touching any date of `range`.
    fn booked_sessions(&self, tutor_id: &str, range: &DateRange) -> Result<Vec<BookedSession>>;

    /// Record a booking. Fails with [`StoreError::SlotTaken`] when the slot
    /// overlaps a session booked since the slots were derived.
    fn book(&mut self, tutor_id: &str, slot: &BookingSlot) -> Result<BookedSession>;
}

/// Process-local store. Availability is kept as the wire JSON so every save
/// and load goes through the same codec as the hosted store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    availability: HashMap<String, (String, u64)>,
    sessions: HashMap<String, Vec<BookedSession>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw stored JSON for a tutor, as if written by another client.
    pub fn insert_raw_availability(&mut self, tutor_id: &str, json: impl Into<String>) {
        let version = self.availability.get(tutor_id).map_or(0, |(_, v)| *v) + 1;
        self.availability.insert(tutor_id.to_string(), (json.into(), version));
    }

    pub fn raw_availability(&self, tutor_id: &str) -> Option<&str> {
        self.availability.get(tutor_id).map(|(json, _)| json.as_str())
    }

    /// Seed a booked session without the overlap check.
    pub fn insert_session(&mut self, tutor_id: &str, session: BookedSession) {
        self.sessions.entry(tutor_id.to_string()).or_default().push(session);
    }
}

impl AvailabilityStore for InMemoryStore {
    fn load(&self, tutor_id: &str) -> Result<Option<Versioned<WeeklyAvailability>>> {
        self.availability
            .get(tutor_id)
            .map(|(json, version)| -> Result<Versioned<WeeklyAvailability>> {
                Ok(Versioned {
                    value: wire::parse_weekly(json)?,
                    version: *version,
                })
            })
            .transpose()
    }

    fn save(
        &mut self,
        tutor_id: &str,
        weekly: &WeeklyAvailability,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let current = self.availability.get(tutor_id).map_or(0, |(_, v)| *v);
        if let Some(expected) = expected_version {
            if expected != current {
                return Err(StoreError::VersionConflict {
                    tutor_id: tutor_id.to_string(),
                    expected,
                    actual: current,
                });
            }
        }
        let json = wire::serialize_weekly(weekly)?;
        let version = current + 1;
        self.availability.insert(tutor_id.to_string(), (json, version));
        Ok(version)
    }
}

impl SessionStore for InMemoryStore {
    fn booked_sessions(&self, tutor_id: &str, range: &DateRange) -> Result<Vec<BookedSession>> {
        Ok(self
            .sessions
            .get(tutor_id)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter(|s| s.start_time.date() <= range.end && s.end_time.date() >= range.start)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn book(&mut self, tutor_id: &str, slot: &BookingSlot) -> Result<BookedSession> {
        let requested = BookedSession::new(slot.starts_at(), slot.ends_at());
        let sessions = self.sessions.entry(tutor_id.to_string()).or_default();
        let taken = sessions
            .iter()
            .any(|s| s.start_time < requested.end_time && requested.start_time < s.end_time);
        if taken {
            return Err(StoreError::SlotTaken {
                date: slot.date,
                start: slot.start,
                end: slot.end,
            });
        }
        sessions.push(requested.clone());
        Ok(requested)
    }
}

/// Entry point tying a store to the availability and booking operations.
#[derive(Debug)]
pub struct Scheduler<S> {
    store: S,
    config: EngineConfig,
}

impl<S> Scheduler<S>
where
    S: AvailabilityStore + SessionStore,
{
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The tutor's week; a tutor with nothing saved has an empty week at version 0.
    pub fn weekly(&self, tutor_id: &str) -> Result<Versioned<WeeklyAvailability>> {
        Ok(self.store.load(tutor_id)?.unwrap_or(Versioned {
            value: WeeklyAvailability::new(),
            version: 0,
        }))
    }

    pub fn save(
        &mut self,
        tutor_id: &str,
        weekly: &WeeklyAvailability,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let version = self.store.save(tutor_id, weekly, expected_version)?;
        info!(tutor = tutor_id, version, minutes = weekly.total_minutes(), "saved availability");
        Ok(version)
    }

    /// Bookable chunks for the tutor over `range`, at the configured slot size.
    pub fn open_week(
        &self,
        tutor_id: &str,
        range: DateRange,
        not_before: Option<NaiveDateTime>,
    ) -> Result<Vec<BookingSlot>> {
        let weekly = self.weekly(tutor_id)?.value;
        let booked = self.store.booked_sessions(tutor_id, &range)?;
        let mut query = SlotQuery::new(tutor_id, range, self.config.slot_granularity);
        query.not_before = not_before;
        Ok(slots::derive_slots(&weekly, &booked, &query))
    }

    /// Turn a picked start time and duration into a bookable slot.
    pub fn offer(
        &self,
        chunks: &[BookingSlot],
        date: NaiveDate,
        start: TimeOfDay,
        duration_minutes: u32,
    ) -> Result<BookingSlot> {
        if !self.config.allows_duration(duration_minutes) {
            return Err(SlotRejection::DurationNotOffered { duration_minutes }.into());
        }
        Ok(slots::select_slot(chunks, date, start, duration_minutes)?)
    }

    /// Book `slot`; the store decides whether it is still free.
    pub fn confirm(&mut self, tutor_id: &str, slot: &BookingSlot) -> Result<BookedSession> {
        debug!(tutor = tutor_id, date = %slot.date, start = %slot.start, "confirming slot");
        let session = self.store.book(tutor_id, slot)?;
        info!(tutor = tutor_id, start = %session.start_time, end = %session.end_time, "booked session");
        Ok(session)
    }
}
