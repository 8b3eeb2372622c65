use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::dao::{
    game_store::{GameStore, UpdateOutcome},
    models::{GameRecordEntity, RoundScoreEntity},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchGameDocument, game_doc_id},
};

const MAX_CONFLICT_RETRIES: u32 = 3;

/// [`GameStore`] talking to CouchDB over its HTTP API.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

/// Outcome of a revisioned PUT.
enum PutOutcome {
    Stored,
    Conflict,
}

impl CouchGameStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<PutOutcome>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(PutOutcome::Conflict),
            status if status.is_success() => Ok(PutOutcome::Stored),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status,
            }),
        }
    }

    async fn save_game(&self, device_id: String, record: GameRecordEntity) -> CouchResult<()> {
        let doc_id = game_doc_id(&device_id);
        for attempt in 1..=MAX_CONFLICT_RETRIES {
            let rev = self
                .get_document::<CouchGameDocument>(&doc_id)
                .await?
                .and_then(|existing| existing.rev);
            let document = CouchGameDocument::from_entity(&device_id, record.clone(), rev);
            match self.put_document(&doc_id, &document).await? {
                PutOutcome::Stored => return Ok(()),
                PutOutcome::Conflict => debug!(%doc_id, attempt, "CouchDB revision conflict"),
            }
        }
        Err(CouchDaoError::Conflict {
            path: doc_id,
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    async fn update_round(
        &self,
        device_id: String,
        round: u32,
        scores: RoundScoreEntity,
    ) -> CouchResult<UpdateOutcome> {
        let doc_id = game_doc_id(&device_id);
        for attempt in 1..=MAX_CONFLICT_RETRIES {
            let Some(mut document) = self.get_document::<CouchGameDocument>(&doc_id).await? else {
                return Ok(UpdateOutcome::NotFound);
            };
            document.round.insert(round, scores);
            document.updated_at = std::time::SystemTime::now();
            match self.put_document(&doc_id, &document).await? {
                PutOutcome::Stored => return Ok(UpdateOutcome::Updated),
                PutOutcome::Conflict => debug!(%doc_id, attempt, round, "CouchDB revision conflict"),
            }
        }
        Err(CouchDaoError::Conflict {
            path: doc_id,
            attempts: MAX_CONFLICT_RETRIES,
        })
    }
}

impl GameStore for CouchGameStore {
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
        Box::pin(async move {
            let doc_id = game_doc_id(&device_id);
            let maybe_doc = store.get_document::<CouchGameDocument>(&doc_id).await?;
            Ok(maybe_doc.map(CouchGameDocument::into_entity))
        })
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
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .authorize(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
