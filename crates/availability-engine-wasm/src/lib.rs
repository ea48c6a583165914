//! WASM bindings for availability-engine.
//!
//! Exposes availability editing (drag-selection commits, explicit slot add and
//! remove) and slot derivation to the browser via `wasm-bindgen`. Weekly
//! availability crosses the boundary in the stored JSON shape, so the front
//! end can pass rows from the store straight through. Everything else is
//! passed as JSON strings too.
//!
//! Validation failures (an overlapping slot, an unavailable start time) are
//! not thrown: they come back as `{"status": "rejected", "reason": "..."}` so
//! the editor can show the message and carry on.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p availability-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/availability-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/availability_engine_wasm.wasm
//! ```

use availability_engine::selection::{self, CellRef, GridGeometry, SelectionMode, SelectionState};
use availability_engine::slots::{self, BookingSlot, DateRange, SlotQuery};
use availability_engine::{wire, Granularity, SlotRejection, TimeOfDay, WeeklyAvailability, Weekday};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Outcome envelope for user-facing validation
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome<T> {
    Ok { value: T },
    Rejected { reason: String },
}

impl<T: Serialize> Outcome<T> {
    fn from_result(result: Result<T, SlotRejection>) -> Self {
        match result {
            Ok(value) => Outcome::Ok { value },
            Err(rejection) => Outcome::Rejected {
                reason: rejection.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers: argument parsing
// ---------------------------------------------------------------------------

fn js_err(context: &str, e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| js_err("Serialization error", e))
}

fn parse_weekly(json: &str) -> Result<WeeklyAvailability, JsValue> {
    wire::parse_weekly(json).map_err(|e| js_err("Invalid availability JSON", e))
}

fn parse_day(day: &str) -> Result<Weekday, JsValue> {
    day.parse().map_err(|e| js_err("Invalid day", e))
}

fn parse_time(time: &str) -> Result<TimeOfDay, JsValue> {
    time.parse().map_err(|e| js_err("Invalid time", e))
}

fn parse_date(date: &str) -> Result<NaiveDate, JsValue> {
    date.parse().map_err(|e| js_err("Invalid date", e))
}

fn parse_granularity(minutes: u32) -> Result<Granularity, JsValue> {
    Granularity::try_from(minutes).map_err(|e| js_err("Invalid granularity", e))
}

fn parse_mode(mode: &str) -> Result<SelectionMode, JsValue> {
    match mode {
        "add" => Ok(SelectionMode::Add),
        "remove" => Ok(SelectionMode::Remove),
        other => Err(JsValue::from_str(&format!(
            "Invalid mode '{}': expected 'add' or 'remove'",
            other
        ))),
    }
}

fn parse_slots(json: &str) -> Result<Vec<BookingSlot>, JsValue> {
    serde_json::from_str(json).map_err(|e| js_err("Invalid slots JSON", e))
}

fn weekly_value(weekly: &WeeklyAvailability) -> Value {
    wire::to_wire_value(weekly)
}

// ---------------------------------------------------------------------------
// WASM exports: availability editing
// ---------------------------------------------------------------------------

/// Re-encode stored availability in canonical form (sorted, merged, all seven
/// days present). Corrupt entries are dropped.
#[wasm_bindgen(js_name = "normalizeWeekly")]
pub fn normalize_weekly(weekly_json: &str) -> Result<String, JsValue> {
    let weekly = parse_weekly(weekly_json)?;
    wire::serialize_weekly(&weekly).map_err(|e| js_err("Serialization error", e))
}

/// Mode a drag starting on `(day, cell)` will use: `"remove"` when the cell is
/// available, `"add"` otherwise.
#[wasm_bindgen(js_name = "selectionMode")]
pub fn selection_mode(
    weekly_json: &str,
    day: &str,
    cell: u16,
    granularity: u32,
) -> Result<String, JsValue> {
    let weekly = parse_weekly(weekly_json)?;
    let anchor = CellRef::new(parse_day(day)?, cell);
    let mode = match selection::mode_for_anchor(&weekly, anchor, parse_granularity(granularity)?) {
        SelectionMode::Add => "add",
        SelectionMode::Remove => "remove",
    };
    Ok(mode.to_string())
}

/// Commit a finished drag from the anchor cell to the cursor cell.
///
/// Returns the next week in the stored JSON shape.
#[wasm_bindgen(js_name = "commitSelection")]
pub fn commit_selection(
    weekly_json: &str,
    anchor_day: &str,
    anchor_cell: u16,
    cursor_day: &str,
    cursor_cell: u16,
    granularity: u32,
) -> Result<String, JsValue> {
    let weekly = parse_weekly(weekly_json)?;
    let granularity = parse_granularity(granularity)?;
    let mut gesture = SelectionState::begin(
        &weekly,
        CellRef::new(parse_day(anchor_day)?, anchor_cell),
        granularity,
    );
    gesture.drag_to(CellRef::new(parse_day(cursor_day)?, cursor_cell));
    to_json(&weekly_value(&gesture.commit(&weekly)))
}

/// Commit an add/remove of `[start, end]` on one day, snapped to the grid.
#[wasm_bindgen(js_name = "commitRange")]
pub fn commit_range(
    weekly_json: &str,
    day: &str,
    start: &str,
    end: &str,
    mode: &str,
    granularity: u32,
) -> Result<String, JsValue> {
    let weekly = parse_weekly(weekly_json)?;
    let day = parse_day(day)?;
    let next_day = selection::commit_range(
        weekly.day(day),
        parse_time(start)?,
        parse_time(end)?,
        parse_mode(mode)?,
        parse_granularity(granularity)?,
    );
    to_json(&weekly_value(&weekly.with_day(day, next_day)))
}

/// Add one slot from the start/end picker.
///
/// Returns `{"status":"ok","value":<week>}` or
/// `{"status":"rejected","reason":"..."}`.
#[wasm_bindgen(js_name = "addSlot")]
pub fn add_slot(weekly_json: &str, day: &str, start: &str, end: &str) -> Result<String, JsValue> {
    let weekly = parse_weekly(weekly_json)?;
    let result = selection::add_slot(&weekly, parse_day(day)?, parse_time(start)?, parse_time(end)?)
        .map(|next| weekly_value(&next));
    to_json(&Outcome::from_result(result))
}

/// Delete the `index`-th slot listed for `day`.
#[wasm_bindgen(js_name = "removeSlot")]
pub fn remove_slot(weekly_json: &str, day: &str, index: usize) -> Result<String, JsValue> {
    let weekly = parse_weekly(weekly_json)?;
    let next = selection::remove_slot(&weekly, parse_day(day)?, index);
    to_json(&weekly_value(&next))
}

/// Map a pointer position to a grid cell.
///
/// `geometry_json` is `{left, top, column_width, row_height, first_row, granularity}`.
/// Returns `{"day": "...", "cell": n}` or `null` outside the grid.
#[wasm_bindgen(js_name = "cellAt")]
pub fn cell_at(geometry_json: &str, x: f64, y: f64) -> Result<String, JsValue> {
    let geometry: GridGeometry =
        serde_json::from_str(geometry_json).map_err(|e| js_err("Invalid geometry JSON", e))?;
    to_json(&geometry.cell_at(x, y))
}

// ---------------------------------------------------------------------------
// WASM exports: booking
// ---------------------------------------------------------------------------

/// Derive bookable chunks from stored availability and booked sessions.
///
/// `booked_json` is an array of `{startTime, endTime}`; `from` and `to` are
/// inclusive `YYYY-MM-DD` dates. Returns an array of booking slots.
#[wasm_bindgen(js_name = "deriveSlots")]
pub fn derive_slots(
    weekly_json: &str,
    booked_json: &str,
    from: &str,
    to: &str,
    granularity: u32,
    tutor_id: &str,
) -> Result<String, JsValue> {
    let weekly = parse_weekly(weekly_json)?;
    let booked =
        wire::parse_booked_sessions(booked_json).map_err(|e| js_err("Invalid sessions JSON", e))?;
    let range = DateRange::new(parse_date(from)?, parse_date(to)?);
    let query = SlotQuery::new(tutor_id, range, parse_granularity(granularity)?);
    to_json(&slots::derive_slots(&weekly, &booked, &query))
}

/// Start times on `date` that fit a `duration_minutes` session, as `"HH:MM"`.
#[wasm_bindgen(js_name = "validStartTimes")]
pub fn valid_start_times(slots_json: &str, date: &str, duration_minutes: u32) -> Result<String, JsValue> {
    let chunks = parse_slots(slots_json)?;
    to_json(&slots::valid_start_times(&chunks, parse_date(date)?, duration_minutes))
}

/// The combined slot for a picked start time and duration, wrapped in the
/// ok/rejected envelope.
#[wasm_bindgen(js_name = "selectSlot")]
pub fn select_slot(
    slots_json: &str,
    date: &str,
    start: &str,
    duration_minutes: u32,
) -> Result<String, JsValue> {
    let chunks = parse_slots(slots_json)?;
    let result = slots::select_slot(&chunks, parse_date(date)?, parse_time(start)?, duration_minutes);
    to_json(&Outcome::from_result(result))
}
