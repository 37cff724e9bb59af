use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minutes since midnight.
pub type Minutes = u32;

pub const MINUTES_PER_DAY: Minutes = 1440;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    pub input: String,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed time {:?}: expected HH:MM", self.input)
    }
}

impl std::error::Error for FormatError {}

/// Parse `"HH:MM"` into minutes since midnight.
///
/// Hours are not clamped, so `"24:00"` parses to 1440. Minutes must be two
/// digits below 60.
pub fn to_minutes(time_str: &str) -> Result<Minutes, FormatError> {
    let err = || FormatError {
        input: time_str.to_string(),
    };
    let (hours, minutes) = time_str.split_once(':').ok_or_else(err)?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || hours.len() > 2 || !all_digits(minutes) || minutes.len() != 2 {
        return Err(err());
    }
    let hours: Minutes = hours.parse().map_err(|_| err())?;
    let minutes: Minutes = minutes.parse().map_err(|_| err())?;
    if minutes >= 60 {
        return Err(err());
    }
    Ok(hours * 60 + minutes)
}

/// Zero-padded 24-hour `"HH:MM"`.
pub fn to_time_str(minutes: Minutes) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// A time of day stored as minutes since midnight. Serializes as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(Minutes);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const LAST_MINUTE: TimeOfDay = TimeOfDay(MINUTES_PER_DAY - 1);

    pub const fn from_minutes(minutes: Minutes) -> Self {
        Self(minutes)
    }

    pub const fn minutes(self) -> Minutes {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_minutes(s).map(TimeOfDay)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = FormatError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        to_time_str(t.0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_time_str(self.0))
    }
}

/// Query window within a day. Not required to be non-empty; an empty or
/// inverted range simply has no free time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub const FULL_DAY: TimeRange = TimeRange {
        start: TimeOfDay::MIDNIGHT,
        end: TimeOfDay::LAST_MINUTE,
    };

    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Absent or blank bounds fall back to `00:00` / `23:59`.
    pub fn parse_or_default(start: Option<&str>, end: Option<&str>) -> Result<Self, FormatError> {
        let parse = |s: Option<&str>, default: TimeOfDay| match s.map(str::trim) {
            None | Some("") => Ok(default),
            Some(s) => s.parse(),
        };
        Ok(Self {
            start: parse(start, Self::FULL_DAY.start)?,
            end: parse(end, Self::FULL_DAY.end)?,
        })
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::FULL_DAY
    }
}

/// Absent or zero durations become 1 minute.
pub fn normalize_min_duration(minutes: Option<Minutes>) -> Minutes {
    match minutes {
        Some(m) if m > 0 => m,
        _ => 1,
    }
}

/// Absent, zero, or unparseable durations become 1 minute.
pub fn parse_min_duration(raw: Option<&str>) -> Minutes {
    normalize_min_duration(raw.and_then(|s| s.trim().parse().ok()))
}
