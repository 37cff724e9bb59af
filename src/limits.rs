/// Upper bound on events stored for one room on one date.
pub const MAX_EVENTS_PER_DATE: usize = 256;

pub const MAX_TITLE_LEN: usize = 200;

pub const MAX_NOTES_LEN: usize = 2000;

/// Page size when a search does not specify one.
pub const DEFAULT_RESULT_LIMIT: usize = 50;
