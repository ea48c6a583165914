//! Tests for the persistence seam, the `Scheduler` facade and configuration.

use chrono::NaiveDate;
use availability_engine::selection::{add_slot, CellRef, SelectionState};
use availability_engine::store::{AvailabilityStore, InMemoryStore, Scheduler, StoreError};
use availability_engine::{
    BookedSession, DateRange, EngineConfig, Granularity, SlotRejection, TimeOfDay,
    WeeklyAvailability, Weekday,
};

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn scheduler() -> Scheduler<InMemoryStore> {
    Scheduler::new(InMemoryStore::new(), EngineConfig::default())
}

fn monday_morning() -> WeeklyAvailability {
    add_slot(&WeeklyAvailability::new(), Weekday::Monday, t("09:00"), t("12:00")).unwrap()
}

// ── Availability persistence ────────────────────────────────────────────────

#[test]
fn unknown_tutor_has_empty_week_at_version_zero() {
    let s = scheduler();
    let current = s.weekly("nobody").unwrap();
    assert!(current.value.is_empty());
    assert_eq!(current.version, 0);
}

#[test]
fn save_then_load_round_trips_through_wire_json() {
    let mut s = scheduler();
    let weekly = monday_morning();

    let version = s.save("tutor-1", &weekly, None).unwrap();
    assert_eq!(version, 1);

    let raw = s.store().raw_availability("tutor-1").unwrap();
    assert!(raw.starts_with(r#"{"monday":[{"day":"monday","start":"09:00","end":"12:00"}]"#));

    let loaded = s.weekly("tutor-1").unwrap();
    assert_eq!(loaded.value, weekly);
    assert_eq!(loaded.version, 1);
}

#[test]
fn save_without_version_is_last_write_wins() {
    let mut s = scheduler();
    s.save("tutor-1", &monday_morning(), None).unwrap();
    s.save("tutor-1", &WeeklyAvailability::new(), None).unwrap();
    let loaded = s.weekly("tutor-1").unwrap();
    assert!(loaded.value.is_empty());
    assert_eq!(loaded.version, 2);
}

#[test]
fn stale_expected_version_is_rejected() {
    let mut s = scheduler();
    let opened = s.weekly("tutor-1").unwrap();
    s.save("tutor-1", &monday_morning(), Some(opened.version)).unwrap();

    // A second editor that opened at version 0 tries to save.
    let err = s.save("tutor-1", &WeeklyAvailability::new(), Some(0)).unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionConflict {
            expected: 0,
            actual: 1,
            ..
        }
    ));
    assert_eq!(s.weekly("tutor-1").unwrap().value, monday_morning());
}

#[test]
fn corrupt_stored_rows_degrade_instead_of_failing() {
    let mut store = InMemoryStore::new();
    store.insert_raw_availability(
        "tutor-1",
        r#"{"monday":[{"day":"monday","start":"09:00","end":"10:00"},{"day":"monday","start":"oops","end":"11:00"}],"someday":[]}"#,
    );
    let loaded = store.load("tutor-1").unwrap().unwrap();
    assert_eq!(loaded.value.total_minutes(), 60);
}

#[test]
fn gesture_edit_then_save() {
    let mut s = scheduler();
    let current = s.weekly("tutor-1").unwrap();

    let mut gesture = SelectionState::begin(
        &current.value,
        CellRef::new(Weekday::Saturday, 10),
        Granularity::Hour,
    );
    gesture.drag_to(CellRef::new(Weekday::Sunday, 12));
    let edited = gesture.commit(&current.value);

    s.save("tutor-1", &edited, Some(current.version)).unwrap();
    let loaded = s.weekly("tutor-1").unwrap().value;
    assert_eq!(loaded.day(Weekday::Sunday).total_minutes(), 180);
    assert_eq!(loaded.day(Weekday::Saturday).total_minutes(), 180);
}

// ── Booking flow ────────────────────────────────────────────────────────────

#[test]
fn open_week_subtracts_stored_sessions() {
    let mut store = InMemoryStore::new();
    store.insert_session(
        "tutor-1",
        BookedSession::parse("2026-03-16T09:30:00", "2026-03-16T10:30:00").unwrap(),
    );
    let mut s = Scheduler::new(store, EngineConfig::default());
    s.save("tutor-1", &monday_morning(), None).unwrap();

    let chunks = s
        .open_week("tutor-1", DateRange::week_of(date("2026-03-16")), None)
        .unwrap();
    let starts: Vec<String> = chunks.iter().map(|c| c.start.to_string()).collect();
    assert_eq!(starts, vec!["09:00", "10:30", "11:00", "11:30"]);
}

#[test]
fn offer_and_confirm_then_second_confirm_fails() {
    let mut s = scheduler();
    s.save("tutor-1", &monday_morning(), None).unwrap();
    let chunks = s
        .open_week("tutor-1", DateRange::single(date("2026-03-16")), None)
        .unwrap();

    let slot = s.offer(&chunks, date("2026-03-16"), t("10:00"), 60).unwrap();
    assert_eq!((slot.start, slot.end), (t("10:00"), t("11:00")));

    let booked = s.confirm("tutor-1", &slot).unwrap();
    assert_eq!(booked.start_time.to_string(), "2026-03-16 10:00:00");

    // A student holding the stale slot list tries the overlapping 10:30 start.
    let stale = s.offer(&chunks, date("2026-03-16"), t("10:30"), 60).unwrap();
    let err = s.confirm("tutor-1", &stale).unwrap_err();
    assert!(matches!(err, StoreError::SlotTaken { .. }));

    // Re-deriving no longer offers the booked hour.
    let fresh = s
        .open_week("tutor-1", DateRange::single(date("2026-03-16")), None)
        .unwrap();
    assert!(fresh.iter().all(|c| c.end <= t("10:00") || c.start >= t("11:00")));
}

#[test]
fn offer_rejects_durations_not_configured() {
    let mut s = scheduler();
    s.save("tutor-1", &monday_morning(), None).unwrap();
    let chunks = s
        .open_week("tutor-1", DateRange::single(date("2026-03-16")), None)
        .unwrap();

    let err = s.offer(&chunks, date("2026-03-16"), t("09:00"), 45).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Rejected(SlotRejection::DurationNotOffered { duration_minutes: 45 })
    ));

    let err = s.offer(&chunks, date("2026-03-16"), t("11:30"), 60).unwrap_err();
    assert!(matches!(err, StoreError::Rejected(SlotRejection::UnavailableStart { .. })));
}

// ── Configuration ───────────────────────────────────────────────────────────

#[test]
fn empty_config_uses_defaults() {
    let config = EngineConfig::from_json("{}").unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.slot_granularity, Granularity::ThirtyMinutes);
    assert!(config.allows_duration(90));
}

#[test]
fn config_overrides_and_validation() {
    let config = EngineConfig::from_json(
        r#"{"slot_granularity": 15, "session_durations": [45], "default_duration": 45}"#,
    )
    .unwrap();
    assert_eq!(config.slot_granularity, Granularity::FifteenMinutes);
    assert_eq!(config.editor_granularity, Granularity::FifteenMinutes);

    assert!(EngineConfig::from_json(r#"{"slot_granularity": 20}"#).is_err());
    assert!(EngineConfig::from_json(r#"{"session_durations": [30], "default_duration": 60}"#).is_err());
    assert!(EngineConfig::from_json(r#"{"session_durations": [0, 60]}"#).is_err());
    assert!(EngineConfig::from_json(r#"{"session_durations": []}"#).is_err());
}
