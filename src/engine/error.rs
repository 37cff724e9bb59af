use crate::model::{RoomKey, Slot};
use crate::store::StoreError;
use crate::time::{FormatError, TimeOfDay};

#[derive(Debug)]
pub enum EngineError {
    Format(FormatError),
    InvalidRange {
        start: TimeOfDay,
        end: TimeOfDay,
    },
    /// The requested block collides with a live event.
    Overlap {
        requested: Slot,
        existing: Slot,
        existing_title: String,
    },
    RoomNotFound(RoomKey),
    /// A request field other than a time could not be understood.
    InvalidRequest(String),
    LimitExceeded(&'static str),
    Store(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Format(e) => write!(f, "{e}"),
            EngineError::InvalidRange { start, end } => {
                write!(f, "start time {start} must be before end time {end}")
            }
            EngineError::Overlap {
                requested,
                existing,
                existing_title,
            } => {
                write!(f, "event {requested} overlaps with existing event {existing}")?;
                if !existing_title.is_empty() {
                    write!(f, " ({existing_title})")?;
                }
                Ok(())
            }
            EngineError::RoomNotFound(key) => write!(f, "room not found: {key}"),
            EngineError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Format(e) => Some(e),
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FormatError> for EngineError {
    fn from(e: FormatError) -> Self {
        EngineError::Format(e)
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}
