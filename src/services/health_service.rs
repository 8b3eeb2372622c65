use tracing::warn;

use crate::{
    dto::health::{CatalogStatus, HealthResponse},
    state::{CatalogState, SharedState},
};

/// Report whether storage is reachable, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let catalog = match state.catalog_state() {
        CatalogState::Loading => CatalogStatus::Loading,
        CatalogState::Ready(_) => CatalogStatus::Ready,
        CatalogState::Failed(_) => CatalogStatus::Failed,
    };

    if state.is_degraded() {
        HealthResponse::degraded(catalog)
    } else {
        HealthResponse::ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::game_store::memory::MemoryGameStore, state::AppState};

    #[tokio::test]
    async fn reports_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        let status = health_status(&state).await;
        assert_eq!(status.status, "degraded");
        assert_eq!(status.catalog, CatalogStatus::Loading);

        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        assert_eq!(health_status(&state).await.status, "ok");
    }
}
