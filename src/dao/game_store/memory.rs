//! Process-local game store used when no database is configured.

use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    game_store::{GameStore, UpdateOutcome},
    models::{GameRecordEntity, RoundScoreEntity},
    storage::StorageResult,
};

/// Game records kept in a concurrent map; lost on restart.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    records: Arc<DashMap<String, GameRecordEntity>>,
}

impl MemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl GameStore for MemoryGameStore {
    fn save_game(
        &self,
        device_id: String,
        mut record: GameRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let records = self.records.clone();
        Box::pin(async move {
            record.updated_at = SystemTime::now();
            records.insert(device_id, record);
            Ok(())
        })
    }

    fn find_game(
        &self,
        device_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>> {
        let records = self.records.clone();
        Box::pin(async move { Ok(records.get(&device_id).map(|entry| entry.value().clone())) })
    }

    fn update_round(
        &self,
        device_id: String,
        round: u32,
        scores: RoundScoreEntity,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
        let records = self.records.clone();
        Box::pin(async move {
            match records.get_mut(&device_id) {
                Some(mut entry) => {
                    entry.set_round(round, scores);
                    Ok(UpdateOutcome::Updated)
                }
                None => Ok(UpdateOutcome::NotFound),
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
