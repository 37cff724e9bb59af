use crate::limits::*;
use crate::model::*;
use crate::time::TimeOfDay;

use super::EngineError;

/// Reject empty and inverted blocks.
pub(crate) fn validate_block(start: TimeOfDay, end: TimeOfDay) -> Result<Slot, EngineError> {
    if start >= end {
        return Err(EngineError::InvalidRange { start, end });
    }
    Ok(Slot::new(start, end))
}

pub(crate) fn validate_text(title: &str, notes: &str) -> Result<(), EngineError> {
    if title.len() > MAX_TITLE_LEN {
        return Err(EngineError::LimitExceeded("event title too long"));
    }
    if notes.len() > MAX_NOTES_LEN {
        return Err(EngineError::LimitExceeded("notes too long"));
    }
    Ok(())
}

/// First live event overlapping `[start, end)`, if any. Cancelled events never conflict.
pub fn find_conflict(events: &[Event], start: TimeOfDay, end: TimeOfDay) -> Option<&Event> {
    events
        .iter()
        .filter(|e| e.is_live() && e.start_time < e.end_time)
        .find(|e| e.start_time < end && start < e.end_time)
}

/// True iff any live event overlaps `[start, end)`.
pub fn overlaps(events: &[Event], start: TimeOfDay, end: TimeOfDay) -> bool {
    find_conflict(events, start, end).is_some()
}

/// `Ok(())` when `slot` is free of live events, otherwise the `Overlap` error naming the
/// conflicting block. `skip` excludes one index (the event being restored).
pub(crate) fn check_no_conflict(
    events: &[Event],
    slot: Slot,
    skip: Option<usize>,
) -> Result<(), EngineError> {
    for (idx, existing) in events.iter().enumerate() {
        // Empty or inverted seeded blocks occupy no time.
        if Some(idx) == skip || !existing.is_live() || existing.start_time >= existing.end_time {
            continue;
        }
        if existing.slot().overlaps(&slot) {
            return Err(EngineError::Overlap {
                requested: slot,
                existing: existing.slot(),
                existing_title: existing.event_title.clone(),
            });
        }
    }
    Ok(())
}
