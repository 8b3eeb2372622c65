use std::{sync::Arc, time::Duration};

use dashmap::mapref::entry::Entry;
use rand::{SeedableRng, rngs::StdRng};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::{
    dto::{
        session::{GuessResponse, SessionView},
        validation::validate_device_id,
    },
    error::ServiceError,
    state::{
        CatalogState, SessionController, SharedState,
        game::{GameRecord, TeamNames},
        session::GameSession,
    },
};

/// Register a brand-new session for `device_id`, replacing any previous one.
pub async fn install_session(
    state: &SharedState,
    device_id: String,
    teams: TeamNames,
) -> Arc<SessionController> {
    let mut session = GameSession::new(
        device_id.clone(),
        teams,
        state.config().rules(),
        StdRng::from_os_rng(),
    );
    if let Some(catalog) = state.catalog_state().ready() {
        session.attach_catalog(catalog);
    }

    let controller = SessionController::new(session, state.sync().clone());
    if let Some(previous) = state.sessions().insert(device_id, controller.clone()) {
        previous.shutdown().await;
    }
    controller
}

const EVICTION_PERIOD: Duration = Duration::from_secs(60);

/// Drop every session idle for at least `idle` and return how many were dropped.
///
/// Nothing is evicted while no store is installed, since an evicted session is
/// only recovered by restoring it from storage.
pub async fn evict_idle_sessions(state: &SharedState, idle: Duration) -> usize {
    if state.require_game_store().await.is_err() {
        return 0;
    }
    let before = state.sessions().len();
    state
        .sessions()
        .retain(|_, controller| !controller.close_if_idle(idle));
    before.saturating_sub(state.sessions().len())
}

/// Periodically evict sessions idle for longer than the configured duration.
pub async fn run_idle_eviction(state: SharedState) {
    let idle = state.config().session_idle();
    let mut interval = interval_at(Instant::now() + EVICTION_PERIOD, EVICTION_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let evicted = evict_idle_sessions(&state, idle).await;
        if evicted > 0 {
            info!(evicted, remaining = state.sessions().len(), "evicted idle sessions");
        } else {
            debug!(sessions = state.sessions().len(), "no idle session to evict");
        }
    }
}

/// Live session of `device_id`, restored from storage when it is not in memory.
pub async fn controller(
    state: &SharedState,
    device_id: &str,
) -> Result<Arc<SessionController>, ServiceError> {
    validate_device_id(device_id).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let existing = state.sessions().get(device_id).map(|entry| entry.clone());
    let controller = match existing {
        Some(controller) => controller,
        None => restore(state, device_id).await?,
    };

    if let Some(catalog) = state.catalog_state().ready() {
        controller.attach_catalog(catalog).await;
    }
    Ok(controller)
}

async fn restore(
    state: &SharedState,
    device_id: &str,
) -> Result<Arc<SessionController>, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(record) = store.find_game(device_id.to_owned()).await? else {
        return Err(ServiceError::NotFound("Game not found".into()));
    };

    let record = GameRecord::from(record);
    let session = GameSession::restore(
        device_id.to_owned(),
        &record,
        state.config().rules(),
        state.catalog_state().ready(),
        StdRng::from_os_rng(),
    )?;

    let controller = SessionController::new(session, state.sync().clone());
    // A concurrent request may have restored or created the session meanwhile.
    let controller = match state.sessions().entry(device_id.to_owned()) {
        Entry::Occupied(occupied) => occupied.get().clone(),
        Entry::Vacant(vacant) => {
            info!(device_id, rounds = record.rounds.len(), "session restored from storage");
            vacant.insert(controller).clone()
        }
    };
    Ok(controller)
}

/// Current view of the session of `device_id`.
pub async fn snapshot(state: &SharedState, device_id: &str) -> Result<SessionView, ServiceError> {
    let controller = controller(state, device_id).await?;
    Ok(controller.snapshot().await.into())
}

/// Start round 1; refused while the catalog is unavailable.
pub async fn start(state: &SharedState, device_id: &str) -> Result<SessionView, ServiceError> {
    let controller = controller(state, device_id).await?;
    if let CatalogState::Failed(message) = state.catalog_state() {
        if !controller.has_catalog().await {
            return Err(ServiceError::CatalogUnavailable(format!(
                "person catalog failed to load: {message}"
            )));
        }
    }
    Ok(controller.start().await?.into())
}

/// Credit a correct guess to the team whose turn it is.
pub async fn guess(state: &SharedState, device_id: &str) -> Result<GuessResponse, ServiceError> {
    let controller = controller(state, device_id).await?;
    let (outcome, snapshot) = controller.correct_guess().await;
    Ok(GuessResponse::new(outcome, snapshot.into()))
}

/// Close the running round before the timer does.
pub async fn end_round(state: &SharedState, device_id: &str) -> Result<SessionView, ServiceError> {
    let controller = controller(state, device_id).await?;
    Ok(controller.end_round().await?.into())
}

/// Open the next round or finish the game.
pub async fn next_round(state: &SharedState, device_id: &str) -> Result<SessionView, ServiceError> {
    let controller = controller(state, device_id).await?;
    Ok(controller.next_round().await?.into())
}

/// Back to round-one defaults.
pub async fn reset(state: &SharedState, device_id: &str) -> Result<SessionView, ServiceError> {
    let controller = controller(state, device_id).await?;
    Ok(controller.reset().await?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::{GameStore, memory::MemoryGameStore},
            models::{GameRecordEntity, RoundScoreEntity},
        },
        dto::session::SessionPhaseDto,
        state::{AppState, game::PersonCatalog},
    };

    async fn app_state() -> (SharedState, MemoryGameStore) {
        let state = AppState::new(AppConfig::default());
        let store = MemoryGameStore::new();
        state.set_game_store(Arc::new(store.clone())).await;
        (state, store)
    }

    fn ready_catalog(state: &SharedState) {
        let persons = crate::dao::catalog::builtin_persons()
            .into_iter()
            .map(Into::into);
        state.set_catalog_state(CatalogState::Ready(Arc::new(PersonCatalog::new(persons))));
    }

    #[tokio::test]
    async fn unknown_device_is_not_found() {
        let (state, _store) = app_state().await;
        let err = snapshot(&state, "nobody").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(message) if message == "Game not found"));
    }

    #[tokio::test]
    async fn malformed_device_id_is_rejected() {
        let (state, _store) = app_state().await;
        let err = snapshot(&state, "two words").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn stored_record_is_restored_into_summary() {
        let (state, store) = app_state().await;
        ready_catalog(&state);
        let mut record = GameRecordEntity::fresh("Reds", "Blues");
        record.set_round(
            1,
            RoundScoreEntity {
                team1_score: 3,
                team2_score: 0,
            },
        );
        record.set_round(
            2,
            RoundScoreEntity {
                team1_score: 0,
                team2_score: 2,
            },
        );
        store.save_game("tablet".into(), record).await.unwrap();

        let view = snapshot(&state, "tablet").await.unwrap();
        assert_eq!(view.current_round, 2);
        assert_eq!(view.team_turn, 2);
        assert!(view.is_drawer_open);
        assert_eq!(view.totals.team1, 3);
        assert_eq!(view.totals.team2, 2);
        assert!(view.catalog_ready);

        let view = next_round(&state, "tablet").await.unwrap();
        assert_eq!(view.current_round, 3);
        assert_eq!(view.team_turn, 1);
        reset(&state, "tablet").await.unwrap();
    }

    #[tokio::test]
    async fn start_waits_for_the_catalog() {
        let (state, _store) = app_state().await;
        install_session(&state, "tablet".into(), TeamNames::new("A", "B")).await;

        let err = start(&state, "tablet").await.unwrap_err();
        assert!(matches!(err, ServiceError::CatalogUnavailable(_)));

        state.set_catalog_state(CatalogState::Failed("unreachable".into()));
        let err = start(&state, "tablet").await.unwrap_err();
        assert!(
            matches!(err, ServiceError::CatalogUnavailable(message) if message.contains("unreachable"))
        );

        ready_catalog(&state);
        let view = start(&state, "tablet").await.unwrap();
        assert!(view.catalog_ready);
        assert_eq!(view.time_left, 60);
        reset(&state, "tablet").await.unwrap();
    }

    #[tokio::test]
    async fn rejected_guess_is_not_an_error() {
        let (state, _store) = app_state().await;
        ready_catalog(&state);
        install_session(&state, "tablet".into(), TeamNames::new("A", "B")).await;

        let response = guess(&state, "tablet").await.unwrap();
        assert!(!response.accepted);
        assert_eq!(response.session.phase, SessionPhaseDto::NotStarted);
    }

    #[tokio::test]
    async fn invalid_transition_is_invalid_state() {
        let (state, _store) = app_state().await;
        ready_catalog(&state);
        install_session(&state, "tablet".into(), TeamNames::new("A", "B")).await;

        let err = next_round(&state, "tablet").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted_and_restored() {
        let (state, _store) = app_state().await;
        ready_catalog(&state);
        crate::services::game_service::create_game(
            &state,
            crate::dto::game::CreateGameRequest {
                device_id: "tablet".into(),
                team1: "Reds".into(),
                team2: "Blues".into(),
            },
        )
        .await
        .unwrap();
        install_session(&state, "busy".into(), TeamNames::new("A", "B")).await;
        start(&state, "busy").await.unwrap();

        let idle = Duration::from_secs(600);
        assert_eq!(evict_idle_sessions(&state, idle).await, 0);

        tokio::time::sleep(Duration::from_secs(601)).await;
        snapshot(&state, "busy").await.unwrap();
        assert_eq!(evict_idle_sessions(&state, idle).await, 1);
        assert!(state.sessions().get("tablet").is_none());
        assert!(state.sessions().get("busy").is_some());

        let view = snapshot(&state, "tablet").await.unwrap();
        assert_eq!(view.phase, SessionPhaseDto::NotStarted);
        assert!(state.sessions().get("tablet").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_evicted_without_a_store() {
        let (state, _store) = app_state().await;
        install_session(&state, "tablet".into(), TeamNames::new("A", "B")).await;
        state.clear_game_store().await;

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(evict_idle_sessions(&state, Duration::from_secs(60)).await, 0);
        assert_eq!(state.sessions().len(), 1);
    }
}
