//! Editing weekly availability: drag-selection over a cell grid and the
//! explicit start/end picker.
//!
//! A drag gesture is a rectangle of (day range × cell range). Its mode is
//! fixed when the gesture starts: starting on an available cell clears,
//! starting on an empty one fills. [`SelectionState::commit`] is a pure
//! reducer from the gesture and the previous week to the next week; pointer
//! handling only needs [`GridGeometry::cell_at`] to produce cell coordinates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AvailabilityError, SlotRejection};
use crate::interval::{DayAvailability, Interval, WeeklyAvailability};
use crate::time::{TimeOfDay, Weekday, MINUTES_PER_DAY};

/// Cell size of an editor grid (or chunk size of bookable slots).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Granularity {
    #[default]
    FifteenMinutes,
    ThirtyMinutes,
    Hour,
}

impl Granularity {
    pub fn minutes(self) -> u16 {
        match self {
            Granularity::FifteenMinutes => 15,
            Granularity::ThirtyMinutes => 30,
            Granularity::Hour => 60,
        }
    }

    pub fn cells_per_day(self) -> u16 {
        MINUTES_PER_DAY / self.minutes()
    }
}

impl TryFrom<u32> for Granularity {
    type Error = AvailabilityError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        match minutes {
            15 => Ok(Granularity::FifteenMinutes),
            30 => Ok(Granularity::ThirtyMinutes),
            60 => Ok(Granularity::Hour),
            other => Err(AvailabilityError::InvalidGranularity(other)),
        }
    }
}

impl From<Granularity> for u32 {
    fn from(granularity: Granularity) -> Self {
        u32::from(granularity.minutes())
    }
}

/// Whether a gesture fills or clears the cells it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Add,
    Remove,
}

/// The `cell`-th grid cell (counted from midnight) of a weekday column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub day: Weekday,
    pub cell: u16,
}

impl CellRef {
    pub fn new(day: Weekday, cell: u16) -> Self {
        Self { day, cell }
    }

    /// The cell containing `time`.
    pub fn at(day: Weekday, time: TimeOfDay, granularity: Granularity) -> Self {
        Self::new(day, time.minutes() / granularity.minutes())
    }

    /// Cell index clamped onto the grid.
    fn clamped(self, granularity: Granularity) -> u16 {
        self.cell.min(granularity.cells_per_day() - 1)
    }

    pub fn start(self, granularity: Granularity) -> TimeOfDay {
        TimeOfDay::saturating(u32::from(self.clamped(granularity)) * u32::from(granularity.minutes()))
    }

    /// End of the cell. The last cell of the day ends at 23:59.
    pub fn end(self, granularity: Granularity) -> TimeOfDay {
        TimeOfDay::saturating(
            (u32::from(self.clamped(granularity)) + 1) * u32::from(granularity.minutes()),
        )
    }

    pub fn span(self, granularity: Granularity) -> Interval {
        Interval {
            start: self.start(granularity),
            end: self.end(granularity),
        }
    }
}

/// Apply one rectangle to a day.
///
/// `Add` unions the rectangle into the day; an interval it partly overlaps
/// keeps its parts outside the rectangle. `Remove` splits every interval it
/// intersects into the residuals before and after it.
pub fn apply_rect(day: &DayAvailability, rect: Interval, mode: SelectionMode) -> DayAvailability {
    match mode {
        SelectionMode::Add => {
            let mut next: Vec<Interval> = day.intervals().to_vec();
            next.push(rect);
            DayAvailability::from_intervals(&next)
        }
        SelectionMode::Remove => day.subtract(&[rect]),
    }
}

/// Commit a selection over one day between two arbitrary times.
///
/// The endpoints are ordered, then snapped outward to cell boundaries of
/// `granularity` so a partially covered cell is selected whole. If both ends
/// fall inside one cell, that cell is selected.
pub fn commit_range(
    day: &DayAvailability,
    range_start: TimeOfDay,
    range_end: TimeOfDay,
    mode: SelectionMode,
    granularity: Granularity,
) -> DayAvailability {
    let step = granularity.minutes();
    let start = range_start.min(range_end).floor_to(step);
    let mut end = range_start.max(range_end).ceil_to(step);
    if end <= start {
        end = TimeOfDay::saturating(u32::from(start.minutes()) + u32::from(step));
    }

    match Interval::new(start, end) {
        Some(rect) => apply_rect(day, rect, mode),
        None => day.clone(),
    }
}

/// Mode of a gesture starting on `anchor`: clear if the cell is available,
/// fill otherwise.
pub fn mode_for_anchor(
    weekly: &WeeklyAvailability,
    anchor: CellRef,
    granularity: Granularity,
) -> SelectionMode {
    if weekly.day(anchor.day).contains_time(anchor.start(granularity)) {
        SelectionMode::Remove
    } else {
        SelectionMode::Add
    }
}

/// Working state of an in-progress drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub mode: SelectionMode,
    pub anchor: CellRef,
    pub cursor: CellRef,
    pub granularity: Granularity,
}

impl SelectionState {
    /// Start a gesture on `anchor`, fixing its mode from the current week.
    pub fn begin(weekly: &WeeklyAvailability, anchor: CellRef, granularity: Granularity) -> Self {
        Self {
            mode: mode_for_anchor(weekly, anchor, granularity),
            anchor,
            cursor: anchor,
            granularity,
        }
    }

    pub fn drag_to(&mut self, cursor: CellRef) {
        self.cursor = cursor;
    }

    /// Days covered by the rectangle, whichever direction the drag went.
    pub fn day_range(&self) -> impl Iterator<Item = Weekday> {
        let lo = self.anchor.day.min(self.cursor.day).index();
        let hi = self.anchor.day.max(self.cursor.day).index();
        Weekday::ALL.into_iter().skip(lo).take(hi - lo + 1)
    }

    /// Time span covered by the rectangle, from the top of the first cell to
    /// the bottom of the last.
    pub fn time_range(&self) -> Interval {
        let g = self.granularity;
        let lo = self.anchor.clamped(g).min(self.cursor.clamped(g));
        let hi = self.anchor.clamped(g).max(self.cursor.clamped(g));
        Interval {
            start: CellRef::new(self.anchor.day, lo).start(g),
            end: CellRef::new(self.anchor.day, hi).end(g),
        }
    }

    /// Whether `cell` is inside the live rectangle (for highlighting).
    pub fn preview(&self, cell: CellRef) -> bool {
        let lo_day = self.anchor.day.min(self.cursor.day);
        let hi_day = self.anchor.day.max(self.cursor.day);
        let g = self.granularity;
        let lo = self.anchor.clamped(g).min(self.cursor.clamped(g));
        let hi = self.anchor.clamped(g).max(self.cursor.clamped(g));
        (lo_day..=hi_day).contains(&cell.day) && (lo..=hi).contains(&cell.cell)
    }

    /// Apply the gesture to `weekly`, returning the next week.
    pub fn commit(self, weekly: &WeeklyAvailability) -> WeeklyAvailability {
        let rect = self.time_range();
        let mut next = weekly.clone();
        for day in self.day_range() {
            next.set_day(day, apply_rect(weekly.day(day), rect, self.mode));
        }
        debug!(mode = ?self.mode, rect = %rect, "committed selection");
        next
    }
}

/// Add one slot chosen with an explicit start/end picker.
///
/// Rejects an empty or inverted range and any strict overlap with the day's
/// existing intervals. A slot that only touches an existing one is accepted
/// and merged with it.
pub fn add_slot(
    weekly: &WeeklyAvailability,
    day: Weekday,
    start: TimeOfDay,
    end: TimeOfDay,
) -> Result<WeeklyAvailability, SlotRejection> {
    let candidate = Interval::new(start, end).ok_or(SlotRejection::EmptyOrInverted { start, end })?;

    let current = weekly.day(day);
    if let Some(existing) = current.first_overlap(&candidate) {
        return Err(SlotRejection::Overlaps { day, existing });
    }

    let mut next: Vec<Interval> = current.intervals().to_vec();
    next.push(candidate);
    Ok(weekly.with_day(day, DayAvailability::from_intervals(&next)))
}

/// Delete the `index`-th listed interval of `day`. Out-of-range is a no-op.
pub fn remove_slot(weekly: &WeeklyAvailability, day: Weekday, index: usize) -> WeeklyAvailability {
    let current = weekly.day(day);
    if index >= current.len() {
        return weekly.clone();
    }
    let mut next: Vec<Interval> = current.intervals().to_vec();
    next.remove(index);
    weekly.with_day(day, DayAvailability::from_intervals(&next))
}

/// Rasterize a day onto a grid: a cell is selected when its whole span is
/// available.
pub fn to_cells(day: &DayAvailability, granularity: Granularity) -> Vec<bool> {
    (0..granularity.cells_per_day())
        .map(|cell| day.covers(&CellRef::new(Weekday::Monday, cell).span(granularity)))
        .collect()
}

/// Collapse a column of selected cells into the minimal interval list.
pub fn from_cells(cells: &[bool], granularity: Granularity) -> DayAvailability {
    let spans: Vec<Interval> = cells
        .iter()
        .enumerate()
        .filter(|(_, selected)| **selected)
        .filter_map(|(idx, _)| u16::try_from(idx).ok())
        .map(|cell| CellRef::new(Weekday::Monday, cell).span(granularity))
        .collect();
    DayAvailability::from_intervals(&spans)
}

/// Layout of a rendered editor grid, used to map pointer positions to cells.
///
/// Columns are weekdays Monday first; rows are cells starting at `first_row`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub left: f64,
    pub top: f64,
    pub column_width: f64,
    pub row_height: f64,
    pub first_row: TimeOfDay,
    pub granularity: Granularity,
}

impl GridGeometry {
    /// The cell under `(x, y)`, or `None` outside the grid.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<CellRef> {
        if self.column_width <= 0.0 || self.row_height <= 0.0 {
            return None;
        }
        let dx = x - self.left;
        let dy = y - self.top;
        if dx < 0.0 || dy < 0.0 || !dx.is_finite() || !dy.is_finite() {
            return None;
        }

        let day = Weekday::from_index((dx / self.column_width) as usize)?;
        let row = (dy / self.row_height) as u32;
        let first = u32::from(self.first_row.minutes() / self.granularity.minutes());
        let cell = first.saturating_add(row);
        if cell >= u32::from(self.granularity.cells_per_day()) {
            return None;
        }
        Some(CellRef::new(day, cell as u16))
    }
}
