mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
#[cfg(test)]
mod tests;

pub use availability::{
    find_available_slots, first_fitting, get_next_availability_on_date, has_sufficient_gap,
    AvailableSlots,
};
pub use conflict::{find_conflict, overlaps};
pub use error::EngineError;
pub use mutations::{
    add_event, cancel_event, remove_user_event, uncancel_event, NewEvent, CANCEL_NOTE, CONFIRM_NOTE,
};

use tracing::debug;

use crate::model::*;
use crate::observability;
use crate::store::RoomStore;

/// Schedule engine over an injected room store.
///
/// Every operation reads the room it needs from the store; nothing is cached
/// between calls. Mutations work on an owned copy and write the affected date
/// back only when it changed, so a rejected mutation never reaches the store.
pub struct Engine<S> {
    store: S,
}

impl<S: RoomStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Load room → apply `f` to a copy → write the date back if `f` reports a change.
    /// A missing room is `RoomNotFound`.
    pub(super) async fn mutate_date<F>(
        &mut self,
        key: &RoomKey,
        date: Date,
        op: &'static str,
        f: F,
    ) -> Result<bool, EngineError>
    where
        F: FnOnce(&mut Room) -> Result<bool, EngineError> + Send,
    {
        let Some(mut room) = self.store.get_room(key).await? else {
            observability::record_mutation(op, "room_not_found");
            return Err(EngineError::RoomNotFound(key.clone()));
        };

        let changed = match f(&mut room) {
            Ok(changed) => changed,
            Err(e) => {
                debug!("{op} on {key} {date} rejected: {e}");
                observability::record_mutation(op, "rejected");
                return Err(e);
            }
        };
        if !changed {
            debug!("{op} on {key} {date}: no matching block");
            observability::record_mutation(op, "noop");
            return Ok(false);
        }

        let events = room.schedule.remove(&date).unwrap_or_default();
        if let Err(e) = self.store.upsert_schedule(key, date, events).await {
            observability::record_mutation(op, "store_error");
            return Err(e.into());
        }
        observability::record_mutation(op, "applied");
        Ok(true)
    }
}
