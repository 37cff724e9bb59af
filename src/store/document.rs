use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::journal::{Journal, Record};
use crate::model::*;
use crate::observability;

use super::{distinct_buildings, group_by_building, RoomStore, StoreError};

// ── Group-commit log channel ─────────────────────────────

enum LogCommand {
    Append {
        record: Record,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        rooms: Vec<Room>,
        response: oneshot::Sender<io::Result<()>>,
    },
}

/// Background task that owns the log and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends.
/// 4. Single sync for the whole batch.
/// 5. Respond to all senders.
async fn log_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<LogCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            LogCommand::Append { record, response } => {
                let mut batch = vec![(record, response)];
                let mut deferred = None;
                loop {
                    match rx.try_recv() {
                        Ok(LogCommand::Append { record, response }) => batch.push((record, response)),
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }
                commit_batch(&mut journal, &mut batch);
                if let Some(other) = deferred {
                    handle_compact(&mut journal, other);
                }
            }
            other => handle_compact(&mut journal, other),
        }
    }
}

fn commit_batch(journal: &mut Journal, batch: &mut Vec<(Record, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(observability::LOG_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = Instant::now();
    let result = flush_batch(journal, batch);
    metrics::histogram!(observability::LOG_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(journal: &mut Journal, batch: &[(Record, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let append_err = batch.iter().find_map(|(record, _)| journal.push(record).err());
    // Flush even on append error so partial bytes don't leak into the next batch.
    let flush_err = journal.sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn handle_compact(journal: &mut Journal, cmd: LogCommand) {
    match cmd {
        LogCommand::Compact { rooms, response } => {
            let _ = response.send(journal.rewrite(&rooms));
        }
        LogCommand::Append { .. } => unreachable!("appends are batched by the caller"),
    }
}

/// Room documents kept in a local, single-process journal file.
///
/// This is not a client for a remote document database: there is no network
/// hop, and the only failures are local I/O or the writer task going away.
/// Reads are served from an ordered in-memory index rebuilt by replaying the
/// journal on open. Every write is synced to the journal before it touches the
/// index, so a failed append leaves the store as it was. Must be opened inside
/// a tokio runtime.
pub struct DocumentStore {
    rooms: BTreeMap<RoomKey, Room>,
    log_tx: mpsc::Sender<LogCommand>,
    appends_since_compact: u64,
    compact_threshold: u64,
}

impl DocumentStore {
    pub fn open(path: &Path, compact_threshold: u64) -> io::Result<Self> {
        let (journal, replayed) = Journal::open(path)?;
        let (log_tx, log_rx) = mpsc::channel(4096);
        tokio::spawn(log_writer_loop(journal, log_rx));

        let rooms = replayed.rooms;
        let replayed = replayed.records;
        info!(
            "opened document store {}: {} rooms from {replayed} records",
            path.display(),
            rooms.len()
        );
        metrics::gauge!(observability::ROOMS_LOADED).set(rooms.len() as f64);

        Ok(Self {
            rooms,
            log_tx,
            // Replayed records count toward compaction so a churned log shrinks on first write.
            appends_since_compact: replayed,
            compact_threshold,
        })
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    async fn log_append(&self, record: &Record) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.log_tx
            .send(LogCommand::Append {
                record: record.clone(),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::Log("log writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Log("log writer dropped response".into()))?
            .map_err(StoreError::Io)
    }

    /// Log-append + apply, then compact if the log has grown past the threshold.
    async fn persist_and_apply(&mut self, record: Record) -> Result<(), StoreError> {
        self.log_append(&record).await?;
        record.apply(&mut self.rooms);
        self.appends_since_compact += 1;
        metrics::gauge!(observability::ROOMS_LOADED).set(self.rooms.len() as f64);

        if self.compact_threshold > 0 && self.appends_since_compact >= self.compact_threshold {
            // The write itself is already durable; a failed compaction is retried next time.
            if let Err(e) = self.compact().await {
                warn!("log compaction failed: {e}");
            }
        }
        Ok(())
    }

    /// Rewrite the journal as one `RoomInserted` record per room.
    pub async fn compact(&mut self) -> Result<(), StoreError> {
        let rooms: Vec<Room> = self.rooms.values().cloned().collect();
        let count = rooms.len();

        let (tx, rx) = oneshot::channel();
        self.log_tx
            .send(LogCommand::Compact { rooms, response: tx })
            .await
            .map_err(|_| StoreError::Log("log writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Log("log writer dropped response".into()))?
            .map_err(StoreError::Io)?;

        info!("compacted log: {} appends folded into {count} records", self.appends_since_compact);
        self.appends_since_compact = 0;
        Ok(())
    }
}

#[async_trait]
impl RoomStore for DocumentStore {
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
        self.persist_and_apply(Record::ScheduleReplaced {
            key: key.clone(),
            date,
            events,
        })
        .await
    }

    async fn insert_room(&mut self, room: Room) -> Result<(), StoreError> {
        self.persist_and_apply(Record::RoomInserted { room }).await
    }
}
