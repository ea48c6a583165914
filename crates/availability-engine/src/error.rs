//! Error types for availability-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::time::{TimeOfDay, Weekday};
use crate::interval::Interval;

/// Errors raised while reading external data or configuration.
#[derive(Error, Debug)]
pub enum AvailabilityError {
    /// A time string was not a zero-padded 24-hour `HH:MM`.
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    /// A day key was not one of `monday` .. `sunday`.
    #[error("Invalid day: {0}")]
    InvalidDay(String),

    /// Only 15, 30 and 60 minute grids exist.
    #[error("Invalid granularity: {0} minutes")]
    InvalidGranularity(u32),

    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload was valid JSON but not the availability shape.
    #[error("Wire format error: {0}")]
    Wire(String),
}

pub type Result<T> = std::result::Result<T, AvailabilityError>;

/// A user-facing validation failure.
///
/// Returned instead of mutating state so the caller can show a message and
/// keep the editing or booking session alive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotRejection {
    #[error("slot end {end} must be after start {start}")]
    EmptyOrInverted { start: TimeOfDay, end: TimeOfDay },

    #[error("slot overlaps existing {day} availability {existing}")]
    Overlaps { day: Weekday, existing: Interval },

    #[error("session duration must be positive")]
    InvalidDuration,

    #[error("{duration_minutes}-minute sessions are not offered")]
    DurationNotOffered { duration_minutes: u32 },

    #[error("no {duration_minutes}-minute slot starts at {start} on {date}")]
    UnavailableStart {
        date: NaiveDate,
        start: TimeOfDay,
        duration_minutes: u32,
    },
}
