//! The fixed-capacity record table and the stat updates applied to it.
//!
//! `RecordTable` is not shared by itself; it is a plain `Vec` of
//! slots. Sharing happens one level up, in [`RecordStore`](crate::RecordStore),
//! which wraps the whole table in a single mutex.

use std::fmt;

use gridduel_protocol::{PlayerId, PlayerRecord};

use crate::RecordError;

/// Number of slots in the table unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 10;

/// Position of a record in the table.
///
/// Match sessions hold slot indices rather than records: the record itself
/// stays in the shared table, and every read or update goes through the
/// store's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotIndex(pub usize);

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// One counter to bump after a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Win,
    Loss,
    Tie,
}

/// The result of a concluded game, in terms of table slots.
///
/// There are exactly two shapes, which is what keeps record updates
/// conserved: a decisive game touches `winner.wins` and `loser.losses`,
/// a draw touches both players' `ties`, and nothing else is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Decisive { winner: SlotIndex, loser: SlotIndex },
    Draw(SlotIndex, SlotIndex),
}

impl GameResult {
    /// The `(slot, stat)` updates this result implies.
    pub fn updates(self) -> [(SlotIndex, Stat); 2] {
        match self {
            Self::Decisive { winner, loser } => {
                [(winner, Stat::Win), (loser, Stat::Loss)]
            }
            Self::Draw(a, b) => [(a, Stat::Tie), (b, Stat::Tie)],
        }
    }
}

/// Fixed-capacity table of player records.
#[derive(Debug, Clone)]
pub struct RecordTable {
    slots: Vec<Option<PlayerRecord>>,
}

impl RecordTable {
    /// Creates an empty table with [`DEFAULT_CAPACITY`] slots.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty table with `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Total number of slots, occupied or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a record in the first free slot.
    ///
    /// # Errors
    /// - [`RecordError::DuplicateId`] if the ID is already present
    /// - [`RecordError::CapacityExceeded`] if no slot is free
    pub fn insert(
        &mut self,
        record: PlayerRecord,
    ) -> Result<SlotIndex, RecordError> {
        if self.find(record.player_id).is_some() {
            return Err(RecordError::DuplicateId(record.player_id));
        }
        let free = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(RecordError::CapacityExceeded(self.capacity()))?;
        self.slots[free] = Some(record);
        Ok(SlotIndex(free))
    }

    /// Linear scan of occupied slots for `id`.
    pub fn find(&self, id: PlayerId) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(|slot| {
                slot.as_ref().is_some_and(|record| record.player_id == id)
            })
            .map(SlotIndex)
    }

    /// Returns the record in an occupied slot.
    pub fn get(&self, index: SlotIndex) -> Result<&PlayerRecord, RecordError> {
        self.slots
            .get(index.0)
            .and_then(Option::as_ref)
            .ok_or(RecordError::InvalidSlot(index))
    }

    /// Increments exactly one counter of one record.
    pub fn apply(
        &mut self,
        index: SlotIndex,
        stat: Stat,
    ) -> Result<(), RecordError> {
        let record = self
            .slots
            .get_mut(index.0)
            .and_then(Option::as_mut)
            .ok_or(RecordError::InvalidSlot(index))?;
        let counter = match stat {
            Stat::Win => &mut record.wins,
            Stat::Loss => &mut record.losses,
            Stat::Tie => &mut record.ties,
        };
        *counter = counter.saturating_add(1);
        Ok(())
    }

    /// Applies both halves of a game result, or neither.
    pub fn apply_result(&mut self, result: GameResult) -> Result<(), RecordError> {
        let [(first, _), (second, _)] = result.updates();
        if first == second {
            return Err(RecordError::SameSlot(first));
        }
        // Validate both slots before touching either.
        self.get(first)?;
        self.get(second)?;
        for (slot, stat) in result.updates() {
            self.apply(slot, stat)?;
        }
        Ok(())
    }

    /// All slots in order, including empty ones.
    pub fn slots(&self) -> &[Option<PlayerRecord>] {
        &self.slots
    }

    /// Occupied records in slot order.
    pub fn records(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.slots.iter().flatten()
    }
}

impl Default for RecordTable {
    fn default() -> Self {
        Self::new()
    }
}
