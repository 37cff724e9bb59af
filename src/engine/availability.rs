use std::iter::FusedIterator;

use crate::model::*;
use crate::time::{normalize_min_duration, Minutes, TimeOfDay, TimeRange};

// ── Gap Sweep ─────────────────────────────────────────────────────

/// Free slots of one date within a query range, ascending and disjoint.
///
/// Produced lazily by sweeping a cursor over the live events sorted by start.
/// Owns its input, so cloning the iterator restarts the sweep from the same point.
#[derive(Debug, Clone)]
pub struct AvailableSlots {
    busy: Vec<Slot>,
    next: usize,
    cursor: TimeOfDay,
    range: TimeRange,
    finished: bool,
}

impl AvailableSlots {
    pub fn new(events: &[Event], range: TimeRange) -> Self {
        let mut busy: Vec<Slot> = events
            .iter()
            .filter(|e| e.is_live() && e.start_time < e.end_time)
            .map(Event::slot)
            .collect();
        busy.sort_by_key(|s| s.start);
        Self {
            busy,
            next: 0,
            cursor: range.start,
            range,
            finished: range.is_empty(),
        }
    }
}

impl Iterator for AvailableSlots {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        if self.finished {
            return None;
        }
        while let Some(&block) = self.busy.get(self.next) {
            self.next += 1;
            // Entirely outside the query range.
            if block.end <= self.range.start || block.start >= self.range.end {
                continue;
            }
            let gap_start = self.cursor.max(self.range.start);
            let gap = (gap_start < block.start).then(|| Slot::new(gap_start, block.start));
            self.cursor = self.cursor.max(block.end);
            if gap.is_some() {
                return gap;
            }
        }
        self.finished = true;
        (self.cursor < self.range.end).then(|| Slot::new(self.cursor, self.range.end))
    }
}

impl FusedIterator for AvailableSlots {}

/// Free slots of `date` on `room` within `range`. An unknown room or a date without
/// events is free for the whole range.
pub fn find_available_slots(room: Option<&Room>, date: Date, range: TimeRange) -> AvailableSlots {
    let events = room.map_or(&[][..], |r| r.events_on(date));
    AvailableSlots::new(events, range)
}

/// First slot lasting at least `min_duration` minutes (a zero minimum counts as 1).
pub fn first_fitting(slots: impl IntoIterator<Item = Slot>, min_duration: Minutes) -> Option<Slot> {
    let min = normalize_min_duration(Some(min_duration));
    slots.into_iter().find(|s| s.duration_minutes() >= min)
}

pub fn get_next_availability_on_date(
    room: Option<&Room>,
    date: Date,
    range: TimeRange,
    min_duration: Minutes,
) -> Option<Slot> {
    first_fitting(find_available_slots(room, date, range), min_duration)
}

pub fn has_sufficient_gap(room: &Room, date: Date, range: TimeRange, min_duration: Minutes) -> bool {
    get_next_availability_on_date(Some(room), date, range, min_duration).is_some()
}
