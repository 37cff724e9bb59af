use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::{Minutes, TimeOfDay};

/// Calendar date of a schedule bucket (`YYYY-MM-DD`).
pub type Date = NaiveDate;

/// Half-open interval `[start, end)` within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Slot {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        debug_assert!(start < end, "Slot start must be before end");
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> Minutes {
        self.end.minutes() - self.start.minutes()
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Slot) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    /// Seeded from the official course schedule.
    Scheduled,
    /// A scheduled event users reported as not happening; its time is free.
    Cancelled,
    /// Created by an end user; the only kind that may be deleted.
    #[serde(rename = "User Reported")]
    UserReported,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "Scheduled",
            EventStatus::Cancelled => "Cancelled",
            EventStatus::UserReported => "User Reported",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event status: {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for EventStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scheduled" => Ok(EventStatus::Scheduled),
            "Cancelled" => Ok(EventStatus::Cancelled),
            "User Reported" => Ok(EventStatus::UserReported),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A single time block in a room's schedule for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: EventStatus,
    #[serde(default)]
    pub event_title: String,
    #[serde(default)]
    pub notes: String,
}

impl Event {
    pub fn slot(&self) -> Slot {
        Slot::new(self.start_time, self.end_time)
    }

    /// Live events occupy their time; cancelled ones do not.
    pub fn is_live(&self) -> bool {
        self.status != EventStatus::Cancelled
    }

    pub fn is_block(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.start_time == start && self.end_time == end
    }
}

/// Unique identity of a room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomKey {
    pub building: String,
    pub room: String,
}

impl RoomKey {
    pub fn new(building: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            building: building.into(),
            room: room.into(),
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.building, self.room)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub building: String,
    pub room: String,
    /// Directions link for the room, when one is known.
    #[serde(default)]
    pub location: Option<String>,
    /// Events per date, each list sorted by `start_time`.
    #[serde(default)]
    pub schedule: BTreeMap<Date, Vec<Event>>,
}

impl Room {
    pub fn new(building: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            building: building.into(),
            room: room.into(),
            location: None,
            schedule: BTreeMap::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn key(&self) -> RoomKey {
        RoomKey::new(self.building.clone(), self.room.clone())
    }

    pub fn matches(&self, filter: &RoomFilter) -> bool {
        filter.building.as_ref().is_none_or(|b| *b == self.building)
            && filter.room.as_ref().is_none_or(|r| *r == self.room)
    }

    pub fn events_on(&self, date: Date) -> &[Event] {
        self.schedule.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Insert an event and re-sort the date's list by start time.
    /// Stable, so equal start times keep their insertion order.
    pub fn insert_event(&mut self, date: Date, event: Event) {
        let events = self.schedule.entry(date).or_default();
        events.push(event);
        events.sort_by_key(|e| e.start_time);
    }
}

/// Optional equality filters over the room set. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomFilter {
    pub building: Option<String>,
    pub room: Option<String>,
}

impl RoomFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn building(building: impl Into<String>) -> Self {
        Self {
            building: Some(building.into()),
            room: None,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAvailability {
    pub building: String,
    pub room: String,
    pub location: Option<String>,
    /// `None` when the room qualified without a fitting slot (no events, range
    /// shorter than the requested duration).
    pub next_availability: Option<Slot>,
}
