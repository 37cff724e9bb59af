//! Durable change journal behind [`DocumentStore`](crate::store::DocumentStore).
//!
//! Each frame is `[u32 le: len][bincode: Record][u32 le: crc32 of payload]`.
//! Replay folds frames straight into a room index and stops at the first
//! truncated or damaged frame; everything before it is kept.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{Date, Event, Room, RoomKey};

/// One change to the room collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    RoomInserted {
        room: Room,
    },
    ScheduleReplaced {
        key: RoomKey,
        date: Date,
        events: Vec<Event>,
    },
}

impl Record {
    /// Fold this change into `rooms`. A schedule for an unknown room creates it.
    pub fn apply(self, rooms: &mut BTreeMap<RoomKey, Room>) {
        match self {
            Record::RoomInserted { room } => {
                rooms.insert(room.key(), room);
            }
            Record::ScheduleReplaced { key, date, events } => {
                rooms
                    .entry(key)
                    .or_insert_with_key(|k| Room::new(k.building.clone(), k.room.clone()))
                    .schedule
                    .insert(date, events);
            }
        }
    }
}

/// Room index rebuilt from a journal file.
#[derive(Debug, Default)]
pub struct Replayed {
    pub rooms: BTreeMap<RoomKey, Room>,
    /// Frames applied, which is how far the file is from its compact form.
    pub records: u64,
}

enum Frame {
    Record(Record),
    End,
    Damaged(String),
}

enum Fill {
    Full,
    /// EOF before the first byte.
    Eof,
    /// EOF part way through.
    Short,
}

fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<Fill> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(Fill::Eof),
            Ok(0) => return Ok(Fill::Short),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Fill::Full)
}

fn read_frame(reader: &mut impl Read) -> io::Result<Frame> {
    let mut len = [0u8; 4];
    match fill(reader, &mut len)? {
        Fill::Full => {}
        Fill::Eof => return Ok(Frame::End),
        Fill::Short => return Ok(Frame::Damaged("truncated length".into())),
    }
    let mut payload = vec![0u8; u32::from_le_bytes(len) as usize];
    let mut crc = [0u8; 4];
    for buf in [&mut payload[..], &mut crc[..]] {
        if !matches!(fill(reader, buf)?, Fill::Full) {
            return Ok(Frame::Damaged("truncated record".into()));
        }
    }
    if u32::from_le_bytes(crc) != crc32fast::hash(&payload) {
        return Ok(Frame::Damaged("checksum mismatch".into()));
    }
    Ok(match bincode::deserialize(&payload) {
        Ok(record) => Frame::Record(record),
        Err(e) => Frame::Damaged(format!("undecodable record: {e}")),
    })
}

fn write_frame(writer: &mut impl Write, record: &Record) -> io::Result<()> {
    let payload =
        bincode::serialize(record).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())
}

pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl Journal {
    /// Replay `path` (missing means empty), then open it for appends.
    pub fn open(path: &Path) -> io::Result<(Self, Replayed)> {
        let replayed = Self::replay(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let journal = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        };
        Ok((journal, replayed))
    }

    pub fn replay(path: &Path) -> io::Result<Replayed> {
        let mut replayed = Replayed::default();
        let mut reader = match File::open(path) {
            Ok(f) => BufReader::new(f),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(replayed),
            Err(e) => return Err(e),
        };
        loop {
            match read_frame(&mut reader)? {
                Frame::Record(record) => {
                    record.apply(&mut replayed.rooms);
                    replayed.records += 1;
                }
                Frame::End => break,
                Frame::Damaged(reason) => {
                    warn!(
                        "{}: {reason} after {} records, ignoring the rest",
                        path.display(),
                        replayed.records
                    );
                    break;
                }
            }
        }
        Ok(replayed)
    }

    /// Buffer one record. Nothing is durable until [`Journal::sync`].
    pub fn push(&mut self, record: &Record) -> io::Result<()> {
        write_frame(&mut self.writer, record)
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    /// Replace the file with one `RoomInserted` per room. Written to a sibling
    /// temp file and renamed over the journal, so a crash leaves one or the other.
    pub fn rewrite<'a>(&mut self, rooms: impl IntoIterator<Item = &'a Room>) -> io::Result<()> {
        let tmp = self.path.with_extension("compact");
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            for room in rooms {
                write_frame(&mut out, &Record::RoomInserted { room: room.clone() })?;
            }
            out.flush()?;
            out.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }
}
