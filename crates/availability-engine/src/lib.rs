//! # availability-engine
//!
//! Weekly availability for tutors and the bookable slots derived from it.
//!
//! A tutor's free time is kept as seven per-weekday lists of `[start, end)`
//! intervals in naive wall-clock minutes. The lists are always sorted and
//! maximally merged; every mutation (a drag over the editor grid, an explicit
//! start/end picker, an import from the store) funnels through [`normalize`].
//! On the booking side, booked sessions are subtracted at read time and the
//! residual free time is chunked into selectable slots.
//!
//! ## Quick start
//!
//! ```rust
//! use availability_engine::{parse_weekly, serialize_weekly, Weekday};
//!
//! let json = r#"{"monday":[{"day":"monday","start":"10:00","end":"11:00"},
//!                          {"day":"monday","start":"09:00","end":"10:00"}]}"#;
//! let weekly = parse_weekly(json).unwrap();
//! assert_eq!(weekly.day(Weekday::Monday).len(), 1);
//!
//! let out = serialize_weekly(&weekly).unwrap();
//! assert!(out.starts_with(r#"{"monday":[{"day":"monday","start":"09:00","end":"11:00"}]"#));
//! ```
//!
//! ## Modules
//!
//! - [`time`] — `TimeOfDay` (minute-of-day) and the closed `Weekday` enum
//! - [`interval`] — `Interval`, `DayAvailability`, `WeeklyAvailability`, normalize/subtract
//! - [`selection`] — Drag-selection reducer, explicit slot add/remove, grid conversion
//! - [`slots`] — Bookable slot derivation and consecutive-chunk combination
//! - [`wire`] — JSON load/save boundary for the hosted store
//! - [`store`] — Injected persistence seam and the `Scheduler` facade
//! - [`config`] — Engine configuration
//! - [`error`] — Error types

pub mod config;
pub mod error;
pub mod interval;
pub mod selection;
pub mod slots;
pub mod store;
pub mod time;
pub mod wire;

pub use config::EngineConfig;
pub use error::{AvailabilityError, SlotRejection};
pub use interval::{normalize, overlaps, subtract, DayAvailability, Interval, WeeklyAvailability};
pub use selection::{add_slot, commit_range, Granularity, SelectionMode, SelectionState};
pub use slots::{derive_slots, BookedSession, BookingSlot, DateRange, SlotQuery};
pub use time::{TimeOfDay, Weekday};
pub use wire::{parse_weekly, serialize_weekly};
