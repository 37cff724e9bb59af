use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::model::*;

use super::{distinct_buildings, group_by_building, RoomStore, StoreError};

/// Process-local room collection. Not synchronized; wrap it in a lock to share it.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rooms: BTreeMap<RoomKey, Room>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rooms(rooms: impl IntoIterator<Item = Room>) -> Self {
        Self {
            rooms: rooms.into_iter().map(|r| (r.key(), r)).collect(),
        }
    }

    // ── Room CRUD ────────────────────────────────────────────

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains_room(&self, key: &RoomKey) -> bool {
        self.rooms.contains_key(key)
    }

    pub fn remove_room(&mut self, key: &RoomKey) -> Option<Room> {
        self.rooms.remove(key)
    }

    /// Drop every room. Used to reset state between test cases.
    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}

#[async_trait]
impl RoomStore for InMemoryStore {
    async fn get_room(&self, key: &RoomKey) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.get(key).cloned())
    }

    async fn get_buildings(&self) -> Result<Vec<String>, StoreError> {
        Ok(distinct_buildings(self.rooms.values()))
    }

    async fn get_rooms_by_building(&self) -> Result<BTreeMap<String, Vec<String>>, StoreError> {
        Ok(group_by_building(self.rooms.values()))
    }

    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, StoreError> {
        Ok(self
            .rooms
            .values()
            .filter(|r| r.matches(filter))
            .cloned()
            .collect())
    }

    async fn upsert_schedule(
        &mut self,
        key: &RoomKey,
        date: Date,
        events: Vec<Event>,
    ) -> Result<(), StoreError> {
        let room = self
            .rooms
            .entry(key.clone())
            .or_insert_with(|| Room::new(key.building.clone(), key.room.clone()));
        room.schedule.insert(date, events);
        Ok(())
    }

    async fn insert_room(&mut self, room: Room) -> Result<(), StoreError> {
        self.rooms.insert(room.key(), room);
        Ok(())
    }
}
