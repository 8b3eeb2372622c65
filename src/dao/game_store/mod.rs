/// CouchDB store.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-memory store.
pub mod memory;
/// MongoDB store.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{GameRecordEntity, RoundScoreEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Result of replacing a single round entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The record exists and the round entry was written.
    Updated,
    /// No record is stored under the device id.
    NotFound,
}

/// Abstraction over the persistence layer for per-device game records.
pub trait GameStore: Send + Sync {
    /// Create or replace the record stored under `device_id`.
    fn save_game(
        &self,
        device_id: String,
        record: GameRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Stored record of `device_id`, if any.
    fn find_game(
        &self,
        device_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>>;
    /// Fully replace the entry of `round` in the record of `device_id`.
    fn update_round(
        &self,
        device_id: String,
        round: u32,
        scores: RoundScoreEntity,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
