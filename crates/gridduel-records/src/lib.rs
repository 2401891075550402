//! Player records for Gridduel.
//!
//! This crate owns the table of player records that every match session
//! reads at login and updates when a game ends:
//!
//! 1. **Table** ([`RecordTable`]): fixed-capacity slots, lookup by ID,
//!    per-counter updates
//! 2. **Store** ([`RecordStore`]): the table behind one shared mutex,
//!    cloned into each session
//! 3. **Storage** ([`RecordStorage`], [`FileStorage`], [`MemoryStorage`]):
//!    loading the table at startup and saving it at shutdown
//!
//! # How it fits in the stack
//!
//! ```text
//! Match Layer (above)  ← looks up players, records game results
//!     ↕
//! Record Layer (this crate)  ← owns records and their persistence
//!     ↕
//! Protocol Layer (below)  ← provides PlayerId, PlayerRecord types
//! ```

mod error;
mod storage;
mod store;
mod table;

pub use error::RecordError;
pub use storage::{
    decode_slots, encode_slots, FileStorage, MemoryStorage, RecordStorage,
    STORED_RECORD_LEN,
};
pub use store::{LoadReport, RecordStore};
pub use table::{GameResult, RecordTable, SlotIndex, Stat, DEFAULT_CAPACITY};
