//! Room persistence behind one async interface.
//!
//! The engine only ever talks to [`RoomStore`]; overlap and gap logic never lives
//! in a backend. Writes take `&mut self`, so a store (and the engine owning it)
//! has at most one writer. Sharing either across tasks needs an external lock.

mod document;
mod memory;

pub use document::DocumentStore;
pub use memory::InMemoryStore;

use std::collections::BTreeMap;
use std::io;

use async_trait::async_trait;

use crate::model::*;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    /// The log writer is gone or a record could not be encoded.
    Log(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::Log(e) => write!(f, "log error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Log(_) => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn get_room(&self, key: &RoomKey) -> Result<Option<Room>, StoreError>;

    /// Distinct building codes, ascending.
    async fn get_buildings(&self) -> Result<Vec<String>, StoreError>;

    async fn get_rooms_by_building(&self) -> Result<BTreeMap<String, Vec<String>>, StoreError>;

    /// Rooms matching `filter`, ordered by building then room number.
    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, StoreError>;

    /// Replace the events of one date, creating the room if it does not exist.
    async fn upsert_schedule(
        &mut self,
        key: &RoomKey,
        date: Date,
        events: Vec<Event>,
    ) -> Result<(), StoreError>;

    /// Insert a room, replacing any existing room with the same key.
    async fn insert_room(&mut self, room: Room) -> Result<(), StoreError>;
}

/// Shared by both backends, which keep rooms in a `BTreeMap` ordered by key.
fn group_by_building<'a>(rooms: impl Iterator<Item = &'a Room>) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for room in rooms {
        grouped
            .entry(room.building.clone())
            .or_default()
            .push(room.room.clone());
    }
    grouped
}

fn distinct_buildings<'a>(rooms: impl Iterator<Item = &'a Room>) -> Vec<String> {
    let mut buildings: Vec<String> = rooms.map(|r| r.building.clone()).collect();
    buildings.sort();
    buildings.dedup();
    buildings
}
