//! The shared record store.
//!
//! Every match session holds a clone of the same [`RecordStore`]. All of
//! them funnel through one coarse mutex around the whole table: lookups,
//! snapshots, and stat updates each take the lock, do their work on plain
//! data, and release it before returning.
//!
//! # Lock discipline
//!
//! - Every method acquires the lock through a guard scoped to that method,
//!   so early returns (including "not found") always release it.
//! - No method awaits anything other than the lock while holding it.
//!   In particular, nothing here touches the network, and `save_all`
//!   encodes under the lock but writes after releasing it.
//! - A game result is applied under a single acquisition, so no other
//!   session can observe one half of it.

use std::sync::Arc;

use gridduel_protocol::{PlayerId, PlayerRecord};
use tokio::sync::Mutex;

use crate::storage::{decode_slots, encode_slots};
use crate::{GameResult, RecordError, RecordStorage, RecordTable, SlotIndex, Stat};

/// Outcome of loading stored records into the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records now in the table.
    pub loaded: usize,
    /// Records skipped because of a duplicate ID or a full table.
    pub rejected: usize,
}

/// Cloneable handle to the shared record table.
#[derive(Debug, Clone)]
pub struct RecordStore {
    table: Arc<Mutex<RecordTable>>,
}

impl RecordStore {
    /// Wraps an existing table.
    pub fn new(table: RecordTable) -> Self {
        Self {
            table: Arc::new(Mutex::new(table)),
        }
    }

    /// An empty store with `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(RecordTable::with_capacity(capacity))
    }

    /// Finds the slot holding `id`.
    ///
    /// # Errors
    /// [`RecordError::NotFound`] if no occupied slot matches. The lock is
    /// released on this path exactly as on the success path.
    pub async fn lookup(&self, id: PlayerId) -> Result<SlotIndex, RecordError> {
        let table = self.table.lock().await;
        table.find(id).ok_or(RecordError::NotFound(id))
    }

    /// A copy of the record in `slot`, taken under the lock.
    pub async fn snapshot(
        &self,
        slot: SlotIndex,
    ) -> Result<PlayerRecord, RecordError> {
        let table = self.table.lock().await;
        table.get(slot).cloned()
    }

    /// Increments one counter of one record.
    pub async fn record_stat(
        &self,
        slot: SlotIndex,
        stat: Stat,
    ) -> Result<(), RecordError> {
        let mut table = self.table.lock().await;
        table.apply(slot, stat)?;
        tracing::debug!(%slot, ?stat, "record updated");
        Ok(())
    }

    /// Applies both updates of a game result under one lock acquisition.
    pub async fn record_result(
        &self,
        result: GameResult,
    ) -> Result<(), RecordError> {
        let mut table = self.table.lock().await;
        table.apply_result(result)?;
        tracing::debug!(?result, "game result recorded");
        Ok(())
    }

    /// Inserts a record directly.
    ///
    /// # Errors
    /// Same as [`RecordTable::insert`].
    pub async fn insert(
        &self,
        record: PlayerRecord,
    ) -> Result<SlotIndex, RecordError> {
        let mut table = self.table.lock().await;
        table.insert(record)
    }

    /// Copies of all occupied records, in slot order.
    pub async fn records(&self) -> Vec<PlayerRecord> {
        let table = self.table.lock().await;
        table.records().cloned().collect()
    }

    /// Number of slots in the table.
    pub async fn capacity(&self) -> usize {
        self.table.lock().await.capacity()
    }

    /// Loads stored records into the table.
    ///
    /// Records that would duplicate an ID already in the table, or that do
    /// not fit, are skipped with a warning and counted in
    /// [`LoadReport::rejected`]; the rest still load.
    ///
    /// # Errors
    /// Storage failures and corrupt images. Nothing is inserted when the
    /// image fails to decode.
    pub async fn load_all<S: RecordStorage>(
        &self,
        storage: &S,
    ) -> Result<LoadReport, RecordError> {
        let bytes = storage.read_all().await?;
        let stored = decode_slots(&bytes)?;

        let mut report = LoadReport::default();
        let mut table = self.table.lock().await;
        for record in stored.into_iter().flatten() {
            let player_id = record.player_id;
            match table.insert(record) {
                Ok(slot) => {
                    report.loaded += 1;
                    tracing::debug!(%player_id, %slot, "record loaded");
                }
                Err(e) => {
                    report.rejected += 1;
                    tracing::warn!(%player_id, error = %e, "stored record rejected");
                }
            }
        }
        drop(table);

        tracing::info!(
            loaded = report.loaded,
            rejected = report.rejected,
            "records loaded"
        );
        Ok(report)
    }

    /// Writes every slot to `storage`.
    pub async fn save_all<S: RecordStorage>(
        &self,
        storage: &S,
    ) -> Result<(), RecordError> {
        let (image, count) = {
            let table = self.table.lock().await;
            (encode_slots(table.slots()), table.len())
        };
        storage.write_all(&image).await?;
        tracing::info!(records = count, "records saved");
        Ok(())
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(RecordTable::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn record(id: u8) -> PlayerRecord {
        PlayerRecord::new(PlayerId(id), "First", "Last").unwrap()
    }

    async fn store_with(ids: &[u8]) -> RecordStore {
        let store = RecordStore::default();
        for &id in ids {
            store.insert(record(id)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_lookup_found_releases_lock() {
        let store = store_with(&[1, 2]).await;
        assert_eq!(store.lookup(PlayerId(2)).await.unwrap(), SlotIndex(1));
        assert!(store.table.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_lookup_not_found_releases_lock() {
        let store = store_with(&[1]).await;
        assert!(matches!(
            store.lookup(PlayerId(9)).await,
            Err(RecordError::NotFound(PlayerId(9)))
        ));
        assert!(store.table.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_failed_update_releases_lock() {
        let store = store_with(&[1]).await;
        assert!(store.record_stat(SlotIndex(5), Stat::Win).await.is_err());
        assert!(store.table.try_lock().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let store = store_with(&[1, 2]).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.record_stat(SlotIndex(0), Stat::Win).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let r = store.snapshot(SlotIndex(0)).await.unwrap();
        assert_eq!(r.wins, 800);
        assert_eq!(store.snapshot(SlotIndex(1)).await.unwrap().wins, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_results_are_conserved() {
        let store = store_with(&[1, 2, 3, 4]).await;
        let results = [
            GameResult::Decisive { winner: SlotIndex(0), loser: SlotIndex(1) },
            GameResult::Draw(SlotIndex(2), SlotIndex(3)),
            GameResult::Decisive { winner: SlotIndex(3), loser: SlotIndex(0) },
        ];

        let mut handles = Vec::new();
        for result in results {
            for _ in 0..50 {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    store.record_result(result).await.unwrap();
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let records = store.records().await;
        let wins: u32 = records.iter().map(|r| r.wins).sum();
        let losses: u32 = records.iter().map(|r| r.losses).sum();
        let ties: u32 = records.iter().map(|r| r.ties).sum();
        assert_eq!(wins, 100);
        assert_eq!(losses, 100);
        assert_eq!(ties, 100);
    }

    #[tokio::test]
    async fn test_load_rejects_duplicates_and_overflow() {
        let mut stored: Vec<PlayerRecord> = (0..11).map(record).collect();
        stored.push(record(0));
        let storage = MemoryStorage::with_records(&stored);

        let store = RecordStore::default();
        let report = store.load_all(&storage).await.unwrap();

        assert_eq!(report, LoadReport { loaded: 10, rejected: 2 });
        assert_eq!(store.records().await.len(), 10);
        assert!(store.lookup(PlayerId(10)).await.is_err());
    }

    #[tokio::test]
    async fn test_load_corrupt_image_inserts_nothing() {
        let storage = MemoryStorage::new();
        storage.write_all(&[1, 2, 3]).await.unwrap();

        let store = RecordStore::default();
        assert!(matches!(
            store.load_all(&storage).await,
            Err(RecordError::Corrupt(_))
        ));
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_stats() {
        let store = store_with(&[4, 7]).await;
        store
            .record_result(GameResult::Decisive {
                winner: SlotIndex(1),
                loser: SlotIndex(0),
            })
            .await
            .unwrap();

        let storage = MemoryStorage::new();
        store.save_all(&storage).await.unwrap();
        assert_eq!(
            storage.contents().await.len(),
            10 * crate::STORED_RECORD_LEN
        );

        let reloaded = RecordStore::default();
        reloaded.load_all(&storage).await.unwrap();
        assert_eq!(reloaded.records().await, store.records().await);
    }
}
