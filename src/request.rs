//! Normalised request shapes for searches and user reports.
//!
//! Raw form values arrive as optional strings; blank strings count as absent.

use std::fmt;
use std::str::FromStr;

use crate::engine::{EngineError, NewEvent};
use crate::limits::DEFAULT_RESULT_LIMIT;
use crate::model::{Date, RoomFilter};
use crate::time::{parse_min_duration, Minutes, TimeOfDay, TimeRange};

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(raw: &str) -> Result<Date, EngineError> {
    raw.trim()
        .parse()
        .map_err(|_| EngineError::InvalidRequest(format!("malformed date {raw:?}: expected YYYY-MM-DD")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub filter: RoomFilter,
    pub date: Date,
    pub range: TimeRange,
    pub min_duration: Minutes,
    pub limit: usize,
}

impl SearchQuery {
    /// Every room, the whole day, any gap of at least a minute.
    pub fn new(date: Date) -> Self {
        Self {
            filter: RoomFilter::any(),
            date,
            range: TimeRange::FULL_DAY,
            min_duration: 1,
            limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn building(mut self, building: impl Into<String>) -> Self {
        self.filter.building = Some(building.into());
        self
    }

    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.filter.room = Some(room.into());
        self
    }

    pub fn range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn min_duration(mut self, minutes: Minutes) -> Self {
        self.min_duration = minutes.max(1);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Build a query from raw form values.
    pub fn parse(
        date: &str,
        building: Option<&str>,
        room: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        duration: Option<&str>,
    ) -> Result<Self, EngineError> {
        let mut query = Self::new(parse_date(date)?)
            .range(TimeRange::parse_or_default(start, end)?)
            .min_duration(parse_min_duration(duration));
        query.filter = RoomFilter {
            building: non_blank(building).map(String::from),
            room: non_blank(room).map(String::from),
        };
        Ok(query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Add,
    Remove,
    Cancel,
    Confirm,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Add => "add",
            ReportKind::Remove => "remove",
            ReportKind::Cancel => "cancel",
            ReportKind::Confirm => "confirm",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(ReportKind::Add),
            "remove" => Ok(ReportKind::Remove),
            "cancel" => Ok(ReportKind::Cancel),
            "confirm" => Ok(ReportKind::Confirm),
            _ => Err(EngineError::InvalidRequest(format!("unknown report kind {s:?}"))),
        }
    }
}

/// A user report against one block of a room's date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Add(NewEvent),
    Remove {
        start: TimeOfDay,
        end: TimeOfDay,
    },
    Cancel {
        start: TimeOfDay,
        end: TimeOfDay,
        notes: String,
    },
    Confirm {
        start: TimeOfDay,
        end: TimeOfDay,
        notes: String,
    },
}

impl Report {
    /// Build a report from raw form values. `title` only matters for `add`.
    pub fn parse(
        kind: &str,
        start: &str,
        end: &str,
        title: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Self, EngineError> {
        let kind: ReportKind = kind.parse()?;
        let start: TimeOfDay = start.trim().parse()?;
        let end: TimeOfDay = end.trim().parse()?;
        let notes = non_blank(notes).unwrap_or_default().to_string();
        Ok(match kind {
            ReportKind::Add => Report::Add(
                NewEvent::user_reported(start, end, non_blank(title).unwrap_or_default())
                    .with_notes(notes),
            ),
            ReportKind::Remove => Report::Remove { start, end },
            ReportKind::Cancel => Report::Cancel { start, end, notes },
            ReportKind::Confirm => Report::Confirm { start, end, notes },
        })
    }

    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Add(_) => ReportKind::Add,
            Report::Remove { .. } => ReportKind::Remove,
            Report::Cancel { .. } => ReportKind::Cancel,
            Report::Confirm { .. } => ReportKind::Confirm,
        }
    }
}
