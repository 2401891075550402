//! Error types for the record layer.

use gridduel_protocol::PlayerId;

use crate::SlotIndex;

/// Errors that can occur while looking up, updating, loading, or saving
/// player records.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// No occupied slot holds this player ID.
    ///
    /// Recoverable during login: the session simply asks again.
    #[error("no record for player {0}")]
    NotFound(PlayerId),

    /// The slot index is out of range or points at an empty slot.
    #[error("{0} is empty or out of range")]
    InvalidSlot(SlotIndex),

    /// Every slot in the table is occupied.
    #[error("record table is full ({0} slots)")]
    CapacityExceeded(usize),

    /// A record with this player ID is already in the table.
    /// IDs must stay unique so that lookup is unambiguous.
    #[error("player {0} already has a record")]
    DuplicateId(PlayerId),

    /// A game result named the same slot for both players.
    #[error("a game result needs two different slots, got {0} twice")]
    SameSlot(SlotIndex),

    /// The stored bytes do not form a valid table.
    #[error("record storage is corrupt: {0}")]
    Corrupt(String),

    /// Reading or writing durable storage failed.
    #[error("record storage I/O failed: {0}")]
    Storage(#[from] std::io::Error),
}
