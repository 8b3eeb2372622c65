use tracing::info;

use crate::{
    dao::{game_store::UpdateOutcome, models::GameRecordEntity},
    dto::game::{CreateGameRequest, GameRecordResponse, UpdateRoundRequest, UpdateRoundResponse},
    error::ServiceError,
    services::session_service,
    state::{SharedState, game::TeamNames},
};

const GAME_NOT_FOUND: &str = "Game not found";

/// Create (or replace) the stored game of a device and open a fresh local session.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameRecordResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let CreateGameRequest {
        device_id,
        team1,
        team2,
    } = request;
    let teams = TeamNames::new(team1.trim(), team2.trim());

    // Pending pushes of a previous game must not land on the new record.
    if let Some((_, previous)) = state.sessions().remove(&device_id) {
        previous.shutdown().await;
    }

    let record = GameRecordEntity::fresh(teams.team1.clone(), teams.team2.clone());
    store.save_game(device_id.clone(), record.clone()).await?;
    session_service::install_session(state, device_id.clone(), teams).await;

    info!(%device_id, "game created");
    Ok(GameRecordResponse::new(device_id, record))
}

/// Read the stored game of a device.
pub async fn find_game(
    state: &SharedState,
    device_id: String,
) -> Result<GameRecordResponse, ServiceError> {
    let store = state.require_game_store().await?;
    match store.find_game(device_id.clone()).await? {
        Some(record) => Ok(GameRecordResponse::new(device_id, record)),
        None => Err(ServiceError::NotFound(GAME_NOT_FOUND.into())),
    }
}

/// Replace the scores of one round of a stored game.
pub async fn update_round(
    state: &SharedState,
    request: UpdateRoundRequest,
) -> Result<UpdateRoundResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let scores = request.scores();
    let outcome = store
        .update_round(request.device_id.clone(), request.round_number, scores)
        .await?;

    match outcome {
        UpdateOutcome::Updated => {
            state
                .sync()
                .forget_round(&request.device_id, request.round_number);
            Ok(UpdateRoundResponse {
                device_id: request.device_id,
                round_number: request.round_number,
                team1_score: scores.team1_score,
                team2_score: scores.team2_score,
            })
        }
        UpdateOutcome::NotFound => Err(ServiceError::NotFound(GAME_NOT_FOUND.into())),
    }
}
