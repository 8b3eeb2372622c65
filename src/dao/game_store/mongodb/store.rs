use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{Collection, Database, bson::doc};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoGameDocument, doc_id, set_round_update},
};
use crate::dao::{
    game_store::{GameStore, UpdateOutcome},
    models::{GameRecordEntity, RoundScoreEntity},
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";

/// [`GameStore`] backed by a MongoDB `games` collection keyed by device id.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        self.state.write().await.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Connect to MongoDB and wait for the first successful ping.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        Ok(Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState { database }),
                config,
            }),
        })
    }

    async fn collection(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn save_game(&self, device_id: String, record: GameRecordEntity) -> MongoResult<()> {
        let document = MongoGameDocument::from_entity(device_id.clone(), record);
        let collection = self.collection().await;
        collection
            .replace_one(doc_id(&device_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { device_id, source })?;
        Ok(())
    }

    async fn find_game(&self, device_id: String) -> MongoResult<Option<GameRecordEntity>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(doc_id(&device_id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { device_id, source })?;
        Ok(document.map(Into::into))
    }

    async fn update_round(
        &self,
        device_id: String,
        round: u32,
        scores: RoundScoreEntity,
    ) -> MongoResult<UpdateOutcome> {
        let collection = self.collection().await;
        let result = collection
            .update_one(doc_id(&device_id), set_round_update(round, scores))
            .await
            .map_err(|source| MongoDaoError::UpdateRound {
                device_id,
                round,
                source,
            })?;

        Ok(if result.matched_count == 0 {
            UpdateOutcome::NotFound
        } else {
            UpdateOutcome::Updated
        })
    }
}

impl GameStore for MongoGameStore {
    fn save_game(
        &self,
        device_id: String,
        record: GameRecordEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_game(device_id, record)
                .await
                .map_err(Into::into)
        })
    }

    fn find_game(
        &self,
        device_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(device_id).await.map_err(Into::into) })
    }

    fn update_round(
        &self,
        device_id: String,
        round: u32,
        scores: RoundScoreEntity,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_round(device_id, round, scores)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
