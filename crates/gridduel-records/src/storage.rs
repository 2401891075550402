//! Durable storage for the record table.
//!
//! The stored form is a flat sequence of fixed-size entries, one per slot
//! (empty slots included), so a table saved with capacity N is exactly
//! `N * STORED_RECORD_LEN` bytes:
//!
//! ```text
//! offset  len  field
//! 0       1    occupied (0 = empty slot, 1 = record)
//! 1       1    player ID
//! 2       10   first name, NUL-terminated, NUL-padded
//! 12      10   last name, NUL-terminated, NUL-padded
//! 22      4    wins   (u32, little-endian)
//! 26      4    losses (u32, little-endian)
//! 30      4    ties   (u32, little-endian)
//! ```
//!
//! Unlike the RECORD wire message, stored counters are full `u32`, so
//! nothing is lost across a save/load cycle.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gridduel_protocol::{Name, PlayerId, PlayerRecord};
use tokio::sync::Mutex;

use crate::RecordError;

/// Size in bytes of one stored slot.
pub const STORED_RECORD_LEN: usize = 34;

const NAME_FIELD_LEN: usize = Name::MAX_LEN + 1;

/// Where the record table lives between server runs.
///
/// Implementations move whole images: the store encodes the table while
/// holding its lock, releases the lock, and only then calls
/// [`write_all`](RecordStorage::write_all).
pub trait RecordStorage: Send + Sync + 'static {
    /// Reads the full stored image. An absent image reads as empty.
    fn read_all(
        &self,
    ) -> impl Future<Output = Result<Vec<u8>, RecordError>> + Send;

    /// Replaces the stored image with `bytes`.
    fn write_all(
        &self,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), RecordError>> + Send;
}

impl<S: RecordStorage> RecordStorage for Arc<S> {
    fn read_all(
        &self,
    ) -> impl Future<Output = Result<Vec<u8>, RecordError>> + Send {
        (**self).read_all()
    }

    fn write_all(
        &self,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), RecordError>> + Send {
        (**self).write_all(bytes)
    }
}

/// Records kept in a single file on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStorage for FileStorage {
    async fn read_all(&self) -> Result<Vec<u8>, RecordError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.path.display(),
                    "records file not found, starting with an empty table"
                );
                Ok(Vec::new())
            }
            Err(e) => Err(RecordError::Storage(e)),
        }
    }

    async fn write_all(&self, bytes: &[u8]) -> Result<(), RecordError> {
        // Write beside the target and rename over it, so a crash mid-write
        // leaves the previous image intact.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "records written"
        );
        Ok(())
    }
}

/// In-memory storage, for tests and for servers that do not persist.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    image: Mutex<Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-loaded with an encoded image of `records`.
    pub fn with_records(records: &[PlayerRecord]) -> Self {
        let slots: Vec<_> = records.iter().cloned().map(Some).collect();
        Self {
            image: Mutex::new(encode_slots(&slots)),
        }
    }

    /// The current stored image.
    pub async fn contents(&self) -> Vec<u8> {
        self.image.lock().await.clone()
    }
}

impl RecordStorage for MemoryStorage {
    async fn read_all(&self) -> Result<Vec<u8>, RecordError> {
        Ok(self.image.lock().await.clone())
    }

    async fn write_all(&self, bytes: &[u8]) -> Result<(), RecordError> {
        *self.image.lock().await = bytes.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encodes every slot, empty ones included.
pub fn encode_slots(slots: &[Option<PlayerRecord>]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(slots.len() * STORED_RECORD_LEN);
    for slot in slots {
        match slot {
            Some(record) => encode_record(record, &mut buf),
            None => buf.extend_from_slice(&[0u8; STORED_RECORD_LEN]),
        }
    }
    buf
}

/// Decodes a stored image into its slots.
///
/// # Errors
/// [`RecordError::Corrupt`] if the image is not a whole number of entries,
/// a flag byte is neither 0 nor 1, or a name is not valid.
pub fn decode_slots(
    bytes: &[u8],
) -> Result<Vec<Option<PlayerRecord>>, RecordError> {
    if bytes.len() % STORED_RECORD_LEN != 0 {
        return Err(RecordError::Corrupt(format!(
            "length {} is not a multiple of {STORED_RECORD_LEN}",
            bytes.len()
        )));
    }
    bytes
        .chunks_exact(STORED_RECORD_LEN)
        .enumerate()
        .map(|(index, entry)| decode_entry(index, entry))
        .collect()
}

fn encode_record(record: &PlayerRecord, buf: &mut Vec<u8>) {
    buf.push(1);
    buf.push(record.player_id.0);
    encode_name(&record.first_name, buf);
    encode_name(&record.last_name, buf);
    buf.extend_from_slice(&record.wins.to_le_bytes());
    buf.extend_from_slice(&record.losses.to_le_bytes());
    buf.extend_from_slice(&record.ties.to_le_bytes());
}

fn encode_name(name: &Name, buf: &mut Vec<u8>) {
    let mut field = [0u8; NAME_FIELD_LEN];
    let bytes = name.as_str().as_bytes();
    field[..bytes.len()].copy_from_slice(bytes);
    buf.extend_from_slice(&field);
}

fn decode_entry(
    index: usize,
    entry: &[u8],
) -> Result<Option<PlayerRecord>, RecordError> {
    match entry[0] {
        0 => return Ok(None),
        1 => {}
        flag => {
            return Err(RecordError::Corrupt(format!(
                "entry {index}: bad occupied flag {flag}"
            )));
        }
    }
    let first_name = decode_name(index, &entry[2..12])?;
    let last_name = decode_name(index, &entry[12..22])?;
    Ok(Some(PlayerRecord {
        player_id: PlayerId(entry[1]),
        first_name,
        last_name,
        wins: read_u32(&entry[22..26]),
        losses: read_u32(&entry[26..30]),
        ties: read_u32(&entry[30..34]),
    }))
}

fn decode_name(index: usize, field: &[u8]) -> Result<Name, RecordError> {
    let end = field
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| {
            RecordError::Corrupt(format!("entry {index}: unterminated name"))
        })?;
    let text = std::str::from_utf8(&field[..end]).map_err(|_| {
        RecordError::Corrupt(format!("entry {index}: name is not UTF-8"))
    })?;
    Name::new(text)
        .map_err(|e| RecordError::Corrupt(format!("entry {index}: {e}")))
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    u32::from_le_bytes(word)
}
