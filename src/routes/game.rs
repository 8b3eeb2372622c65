use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::game::{
        CreateGameRequest, DeviceQuery, GameRecordResponse, UpdateRoundRequest,
        UpdateRoundResponse,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes handling the stored game record of a device.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/game",
        get(find_game).post(create_game).put(update_round),
    )
}

/// Create (or replace) the game of a device and start a fresh session.
#[utoipa::path(
    post,
    path = "/game",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameRecordResponse),
        (status = 400, description = "Invalid device id or team names"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<GameRecordResponse>, AppError> {
    let record = game_service::create_game(&state, payload).await?;
    Ok(Json(record))
}

/// Read the stored game of a device.
#[utoipa::path(
    get,
    path = "/game",
    tag = "game",
    params(DeviceQuery),
    responses(
        (status = 200, description = "Stored game record", body = GameRecordResponse),
        (status = 404, description = "Game not found"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn find_game(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<DeviceQuery>>,
) -> Result<Json<GameRecordResponse>, AppError> {
    let record = game_service::find_game(&state, query.device_id).await?;
    Ok(Json(record))
}

/// Replace the scores of one round.
#[utoipa::path(
    put,
    path = "/game",
    tag = "game",
    request_body = UpdateRoundRequest,
    responses(
        (status = 200, description = "Round updated", body = UpdateRoundResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Game not found"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn update_round(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<UpdateRoundRequest>>,
) -> Result<Json<UpdateRoundResponse>, AppError> {
    let response = game_service::update_round(&state, payload).await?;
    Ok(Json(response))
}
