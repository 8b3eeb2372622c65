/// Async owner of a session and its round ticker.
pub mod controller;
/// Core game types shared by the session layer.
pub mod game;
/// Per-round score ledger.
pub mod ledger;
/// Pool of persons not yet guessed.
pub mod pool;
/// Pure round and scoring state of one game.
pub mod session;
mod sse;
/// Session phases and validated transitions.
pub mod state_machine;
/// Round countdown.
pub mod timer;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig, dao::game_store::GameStore, error::ServiceError,
    services::sync_service::RoundSync,
};

pub use self::controller::SessionController;
pub use self::sse::SseHub;
use self::game::PersonCatalog;

/// Shared handle on [`AppState`] passed to handlers.
pub type SharedState = Arc<AppState>;

/// Swappable handle on the installed game store.
#[derive(Clone, Default)]
pub struct StoreSlot {
    inner: Arc<RwLock<Option<Arc<dyn GameStore>>>>,
}

impl StoreSlot {
    /// Current store, if one is installed.
    pub async fn get(&self) -> Option<Arc<dyn GameStore>> {
        self.inner.read().await.as_ref().cloned()
    }

    /// Install `store`, replacing the previous one.
    pub async fn install(&self, store: Arc<dyn GameStore>) {
        *self.inner.write().await = Some(store);
    }

    /// Drop the installed store.
    pub async fn clear(&self) {
        self.inner.write().await.take();
    }
}

/// Loading state of the person catalog shared by every session.
#[derive(Debug, Clone)]
pub enum CatalogState {
    /// The background load has not finished.
    Loading,
    /// The catalog is available to sessions.
    Ready(Arc<PersonCatalog>),
    /// Loading failed with the given message.
    Failed(String),
}

impl CatalogState {
    /// Loaded catalog, if ready.
    pub fn ready(&self) -> Option<Arc<PersonCatalog>> {
        match self {
            CatalogState::Ready(catalog) => Some(catalog.clone()),
            _ => None,
        }
    }
}

/// Central application state: storage handle, catalog, sessions and sync adapter.
pub struct AppState {
    config: AppConfig,
    store: StoreSlot,
    degraded: watch::Sender<bool>,
    catalog: watch::Sender<CatalogState>,
    sessions: DashMap<String, Arc<SessionController>>,
    sync: Arc<RoundSync>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed
    /// and with the catalog loading.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let (catalog_tx, _rx) = watch::channel(CatalogState::Loading);
        let store = StoreSlot::default();
        let sync = RoundSync::new(store.clone(), config.sync());
        Arc::new(Self {
            config,
            store,
            degraded: degraded_tx,
            catalog: catalog_tx,
            sessions: DashMap::new(),
            sync,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.store.get().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        self.store.install(store).await;
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        self.store.clear().await;
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Current catalog loading state.
    pub fn catalog_state(&self) -> CatalogState {
        self.catalog.borrow().clone()
    }

    /// Replace the catalog loading state.
    pub fn set_catalog_state(&self, state: CatalogState) {
        self.catalog.send_replace(state);
    }

    /// Registry of live sessions keyed by device id.
    pub fn sessions(&self) -> &DashMap<String, Arc<SessionController>> {
        &self.sessions
    }

    /// Adapter replicating round scores to storage.
    pub fn sync(&self) -> &Arc<RoundSync> {
        &self.sync
    }
}
