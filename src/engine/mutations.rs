use tracing::info;

use crate::limits::*;
use crate::model::*;
use crate::request::Report;
use crate::store::RoomStore;
use crate::time::TimeOfDay;

use super::conflict::{check_no_conflict, validate_block, validate_text};
use super::{Engine, EngineError};

pub const CANCEL_NOTE: &str = "User reported event as cancelled.";
pub const CONFIRM_NOTE: &str = "User Confirmed.";

/// An event about to be added to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub event_title: String,
    pub notes: String,
    pub status: EventStatus,
}

impl NewEvent {
    pub fn user_reported(start_time: TimeOfDay, end_time: TimeOfDay, event_title: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            event_title: event_title.into(),
            notes: String::new(),
            status: EventStatus::UserReported,
        }
    }

    pub fn scheduled(start_time: TimeOfDay, end_time: TimeOfDay, event_title: impl Into<String>) -> Self {
        Self {
            status: EventStatus::Scheduled,
            ..Self::user_reported(start_time, end_time, event_title)
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

fn audit_note(base: &str, explanation: &str) -> String {
    if explanation.is_empty() {
        base.to_string()
    } else {
        format!("{base} Explanation: {explanation}")
    }
}

// ── Room-level operations ─────────────────────────────────────────

/// Validate and insert `event`, keeping the date sorted by start time.
pub fn add_event(room: &mut Room, date: Date, event: NewEvent) -> Result<(), EngineError> {
    let slot = validate_block(event.start_time, event.end_time)?;
    validate_text(&event.event_title, &event.notes)?;
    let existing = room.events_on(date);
    if existing.len() >= MAX_EVENTS_PER_DATE {
        return Err(EngineError::LimitExceeded("too many events on date"));
    }
    check_no_conflict(existing, slot, None)?;

    room.insert_event(
        date,
        Event {
            start_time: event.start_time,
            end_time: event.end_time,
            status: event.status,
            event_title: event.event_title,
            notes: event.notes,
        },
    );
    Ok(())
}

/// Delete the exact `[start, end)` block if it was user reported.
pub fn remove_user_event(room: &mut Room, date: Date, start: TimeOfDay, end: TimeOfDay) -> bool {
    let Some(events) = room.schedule.get_mut(&date) else {
        return false;
    };
    match events
        .iter()
        .position(|e| e.is_block(start, end) && e.status == EventStatus::UserReported)
    {
        Some(pos) => {
            events.remove(pos);
            true
        }
        None => false,
    }
}

/// `Scheduled → Cancelled` for the exact block. Prior notes are replaced.
pub fn cancel_event(room: &mut Room, date: Date, start: TimeOfDay, end: TimeOfDay, notes: &str) -> bool {
    let Some(event) = room
        .schedule
        .get_mut(&date)
        .and_then(|events| {
            events
                .iter_mut()
                .find(|e| e.is_block(start, end) && e.status == EventStatus::Scheduled)
        })
    else {
        return false;
    };
    event.status = EventStatus::Cancelled;
    event.notes = audit_note(CANCEL_NOTE, notes);
    true
}

/// `Cancelled → Scheduled` for the exact block. Prior notes are replaced.
///
/// Fails with `Overlap` if a live event was added over the block while it was
/// cancelled.
pub fn uncancel_event(
    room: &mut Room,
    date: Date,
    start: TimeOfDay,
    end: TimeOfDay,
    notes: &str,
) -> Result<bool, EngineError> {
    let Some(events) = room.schedule.get_mut(&date) else {
        return Ok(false);
    };
    let Some(idx) = events
        .iter()
        .position(|e| e.is_block(start, end) && e.status == EventStatus::Cancelled)
    else {
        return Ok(false);
    };
    // Empty or inverted seeded blocks occupy no time and cannot collide.
    if start < end {
        check_no_conflict(events, Slot::new(start, end), Some(idx))?;
    }

    let event = &mut events[idx];
    event.status = EventStatus::Scheduled;
    event.notes = audit_note(CONFIRM_NOTE, notes);
    Ok(true)
}

// ── Store-backed operations ───────────────────────────────────────

fn missing_room_is_false(result: Result<bool, EngineError>) -> Result<bool, EngineError> {
    match result {
        Err(EngineError::RoomNotFound(_)) => Ok(false),
        other => other,
    }
}

impl<S: RoomStore> Engine<S> {
    pub async fn add_event(&mut self, key: &RoomKey, date: Date, event: NewEvent) -> Result<(), EngineError> {
        let block = format!("{} - {}", event.start_time, event.end_time);
        let status = event.status;
        self.mutate_date(key, date, "add", move |room| {
            add_event(room, date, event)?;
            Ok(true)
        })
        .await?;
        info!("added {status} event {block} to {key} on {date}");
        Ok(())
    }

    pub async fn remove_user_event(
        &mut self,
        key: &RoomKey,
        date: Date,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<bool, EngineError> {
        let removed = missing_room_is_false(
            self.mutate_date(key, date, "remove", |room| {
                Ok(remove_user_event(room, date, start, end))
            })
            .await,
        )?;
        if removed {
            info!("removed user event {start} - {end} from {key} on {date}");
        }
        Ok(removed)
    }

    pub async fn cancel_event(
        &mut self,
        key: &RoomKey,
        date: Date,
        start: TimeOfDay,
        end: TimeOfDay,
        notes: &str,
    ) -> Result<bool, EngineError> {
        validate_text("", notes)?;
        let cancelled = missing_room_is_false(
            self.mutate_date(key, date, "cancel", |room| {
                Ok(cancel_event(room, date, start, end, notes))
            })
            .await,
        )?;
        if cancelled {
            info!("cancelled {start} - {end} in {key} on {date}");
        }
        Ok(cancelled)
    }

    pub async fn uncancel_event(
        &mut self,
        key: &RoomKey,
        date: Date,
        start: TimeOfDay,
        end: TimeOfDay,
        notes: &str,
    ) -> Result<bool, EngineError> {
        validate_text("", notes)?;
        let confirmed = missing_room_is_false(
            self.mutate_date(key, date, "uncancel", |room| {
                uncancel_event(room, date, start, end, notes)
            })
            .await,
        )?;
        if confirmed {
            info!("confirmed {start} - {end} in {key} on {date}");
        }
        Ok(confirmed)
    }

    /// Dispatch a user report. `Ok(false)` means the targeted block was not found.
    pub async fn apply_report(&mut self, key: &RoomKey, date: Date, report: Report) -> Result<bool, EngineError> {
        match report {
            Report::Add(event) => self.add_event(key, date, event).await.map(|()| true),
            Report::Remove { start, end } => self.remove_user_event(key, date, start, end).await,
            Report::Cancel { start, end, notes } => self.cancel_event(key, date, start, end, &notes).await,
            Report::Confirm { start, end, notes } => {
                self.uncancel_event(key, date, start, end, &notes).await
            }
        }
    }
}
