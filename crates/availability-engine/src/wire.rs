//! JSON load/save boundary with the hosted store.
//!
//! The stored shape is
//! `{"monday": [{"day": "monday", "start": "09:00", "end": "12:00"}], ..., "sunday": []}`.
//! Writing always emits all seven keys, Monday first. Reading is lenient:
//! corrupt entries are dropped with a warning so a partly broken row degrades
//! to less availability instead of failing the whole load.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::{AvailabilityError, Result};
use crate::interval::{Interval, WeeklyAvailability};
use crate::slots::BookedSession;
use crate::time::{TimeOfDay, Weekday};

/// One stored availability entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSlot {
    pub day: String,
    pub start: String,
    pub end: String,
}

impl WireSlot {
    fn from_interval(day: Weekday, interval: &Interval) -> Self {
        Self {
            day: day.key().to_string(),
            start: interval.start.to_string(),
            end: interval.end.to_string(),
        }
    }
}

/// Parse the stored JSON text into a normalized week.
///
/// # Errors
/// Returns `AvailabilityError::Json` for malformed JSON and
/// `AvailabilityError::Wire` when the top level is not an object.
pub fn parse_weekly(json: &str) -> Result<WeeklyAvailability> {
    let value: Value = serde_json::from_str(json)?;
    parse_weekly_value(&value)
}

/// Parse an already-decoded JSON value into a normalized week.
pub fn parse_weekly_value(value: &Value) -> Result<WeeklyAvailability> {
    let object = match value {
        Value::Object(map) => map,
        // A tutor who never saved availability comes back as null.
        Value::Null => return Ok(WeeklyAvailability::new()),
        other => {
            return Err(AvailabilityError::Wire(format!(
                "expected an object of weekday keys, got {}",
                json_kind(other)
            )))
        }
    };

    let mut entries: Vec<(Weekday, Interval)> = Vec::new();
    for (key, slots) in object {
        let day: Weekday = match key.parse() {
            Ok(day) => day,
            Err(_) => {
                warn!(key = %key, "dropping unknown day key");
                continue;
            }
        };
        let Some(slots) = slots.as_array() else {
            warn!(day = %day, "dropping non-array day value");
            continue;
        };
        entries.extend(slots.iter().filter_map(|slot| decode_slot(day, slot)).map(|iv| (day, iv)));
    }

    Ok(entries.into_iter().collect())
}

fn decode_slot(day: Weekday, value: &Value) -> Option<Interval> {
    let slot: WireSlot = match serde_json::from_value(value.clone()) {
        Ok(slot) => slot,
        Err(e) => {
            warn!(day = %day, error = %e, "dropping malformed slot");
            return None;
        }
    };
    if slot.day != day.key() {
        warn!(day = %day, slot_day = %slot.day, "slot day disagrees with its key; keeping it under the key");
    }

    let (start, end) = match (slot.start.parse::<TimeOfDay>(), slot.end.parse::<TimeOfDay>()) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(e), _) | (_, Err(e)) => {
            warn!(day = %day, error = %e, "dropping slot with unparseable time");
            return None;
        }
    };

    let interval = Interval::new(start, end);
    if interval.is_none() {
        warn!(day = %day, start = %start, end = %end, "dropping empty or inverted slot");
    }
    interval
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Encode a week into the stored JSON value, all seven keys Monday first.
pub fn to_wire_value(weekly: &WeeklyAvailability) -> Value {
    let mut map = Map::new();
    for (day, availability) in weekly.iter() {
        let slots: Vec<Value> = availability
            .iter()
            .map(|iv| {
                let slot = WireSlot::from_interval(day, iv);
                json!({ "day": slot.day, "start": slot.start, "end": slot.end })
            })
            .collect();
        map.insert(day.key().to_string(), Value::Array(slots));
    }
    Value::Object(map)
}

/// Encode a week into compact stored JSON text.
pub fn serialize_weekly(weekly: &WeeklyAvailability) -> Result<String> {
    Ok(serde_json::to_string(&to_wire_value(weekly))?)
}

/// Parse a JSON array of `{startTime, endTime}` booked sessions.
///
/// Entries with missing, unparseable or inverted times are dropped with a
/// warning.
///
/// # Errors
/// Returns `AvailabilityError::Json` for malformed JSON and
/// `AvailabilityError::Wire` when the top level is not an array.
pub fn parse_booked_sessions(json: &str) -> Result<Vec<BookedSession>> {
    let value: Value = serde_json::from_str(json)?;
    let entries = match value {
        Value::Array(entries) => entries,
        other => {
            return Err(AvailabilityError::Wire(format!(
                "expected an array of sessions, got {}",
                json_kind(&other)
            )))
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<BookedSession>(entry) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "dropping malformed booked session");
                None
            }
        })
        .collect())
}
