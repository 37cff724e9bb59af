use std::collections::BTreeMap;
use std::time::Instant;

use tracing::debug;

use crate::model::*;
use crate::observability;
use crate::request::SearchQuery;
use crate::store::RoomStore;
use crate::time::{normalize_min_duration, Minutes, TimeRange};

use super::availability::{self, AvailableSlots};
use super::{Engine, EngineError};

/// Records the query latency histogram when dropped.
struct QueryTimer {
    query: &'static str,
    start: Instant,
}

impl QueryTimer {
    fn start(query: &'static str) -> Self {
        Self {
            query,
            start: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "query" => self.query)
            .record(self.start.elapsed().as_secs_f64());
    }
}

impl<S: RoomStore> Engine<S> {
    pub async fn get_room(&self, key: &RoomKey) -> Result<Option<Room>, EngineError> {
        Ok(self.store.get_room(key).await?)
    }

    /// Full schedule of one room, or `None` if the room does not exist.
    pub async fn get_schedule(
        &self,
        key: &RoomKey,
    ) -> Result<Option<BTreeMap<Date, Vec<Event>>>, EngineError> {
        let _timer = QueryTimer::start("schedule");
        Ok(self.store.get_room(key).await?.map(|room| room.schedule))
    }

    pub async fn buildings(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.store.get_buildings().await?)
    }

    pub async fn rooms_by_building(&self) -> Result<BTreeMap<String, Vec<String>>, EngineError> {
        Ok(self.store.get_rooms_by_building().await?)
    }

    /// Free slots of one room's date. An unknown room is free for the whole range.
    pub async fn find_available_slots(
        &self,
        key: &RoomKey,
        date: Date,
        range: TimeRange,
    ) -> Result<AvailableSlots, EngineError> {
        let _timer = QueryTimer::start("slots");
        let room = self.store.get_room(key).await?;
        Ok(availability::find_available_slots(room.as_ref(), date, range))
    }

    pub async fn get_next_availability_on_date(
        &self,
        key: &RoomKey,
        date: Date,
        range: TimeRange,
        min_duration: Minutes,
    ) -> Result<Option<Slot>, EngineError> {
        let _timer = QueryTimer::start("next_availability");
        let room = self.store.get_room(key).await?;
        Ok(availability::get_next_availability_on_date(
            room.as_ref(),
            date,
            range,
            min_duration,
        ))
    }

    /// Rooms matching `filter` that are free on `date`, in store order (building,
    /// then room). A room without events that day qualifies outright; any other
    /// room needs a free slot of at least `min_duration` minutes. Stops after
    /// `limit` rooms.
    pub async fn get_rooms_with_sufficient_gap(
        &self,
        filter: &RoomFilter,
        date: Date,
        range: TimeRange,
        min_duration: Minutes,
        limit: usize,
    ) -> Result<Vec<Room>, EngineError> {
        let _timer = QueryTimer::start("sufficient_gap");
        if limit == 0 {
            return Ok(Vec::new());
        }
        let min = normalize_min_duration(Some(min_duration));
        let rooms: Vec<Room> = self
            .store
            .list_rooms(filter)
            .await?
            .into_iter()
            .filter(|room| {
                room.events_on(date).is_empty()
                    || availability::has_sufficient_gap(room, date, range, min)
            })
            .take(limit)
            .collect();
        debug!("{} rooms with a {min} minute gap on {date}", rooms.len());
        Ok(rooms)
    }

    /// Qualifying rooms paired with their first fitting slot, if any.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RoomAvailability>, EngineError> {
        let rooms = self
            .get_rooms_with_sufficient_gap(
                &query.filter,
                query.date,
                query.range,
                query.min_duration,
                query.limit,
            )
            .await?;
        Ok(rooms
            .into_iter()
            .map(|room| {
                let next_availability = availability::get_next_availability_on_date(
                    Some(&room),
                    query.date,
                    query.range,
                    query.min_duration,
                );
                RoomAvailability {
                    building: room.building,
                    room: room.room,
                    location: room.location,
                    next_availability,
                }
            })
            .collect())
    }
}
