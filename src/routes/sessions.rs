use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::{get, post},
};
use futures::Stream;
use tracing::info;

use crate::{
    dto::session::{GuessResponse, SessionView},
    error::AppError,
    services::{session_service, sse_service},
    state::SharedState,
};

/// Live session driving endpoints, one session per device.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/{device_id}", get(get_session))
        .route("/sessions/{device_id}/start", post(start_round))
        .route("/sessions/{device_id}/guess", post(correct_guess))
        .route("/sessions/{device_id}/end-round", post(end_round))
        .route("/sessions/{device_id}/next-round", post(next_round))
        .route("/sessions/{device_id}/reset", post(reset_game))
        .route("/sessions/{device_id}/events", get(session_events))
}

/// Current view of the session, restored from storage when needed.
#[utoipa::path(
    get,
    path = "/sessions/{device_id}",
    tag = "sessions",
    params(("device_id" = String, Path, description = "Device owning the session")),
    responses(
        (status = 200, description = "Current session view", body = SessionView),
        (status = 404, description = "Game not found")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(device_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::snapshot(&state, &device_id).await?))
}

/// Start the current round and its countdown.
#[utoipa::path(
    post,
    path = "/sessions/{device_id}/start",
    tag = "sessions",
    params(("device_id" = String, Path, description = "Device owning the session")),
    responses(
        (status = 200, description = "Round started", body = SessionView),
        (status = 409, description = "Session cannot start from its current phase"),
        (status = 503, description = "Person catalog unavailable")
    )
)]
pub async fn start_round(
    State(state): State<SharedState>,
    Path(device_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::start(&state, &device_id).await?))
}

/// Award a point to the playing team and draw the next person.
#[utoipa::path(
    post,
    path = "/sessions/{device_id}/guess",
    tag = "sessions",
    params(("device_id" = String, Path, description = "Device owning the session")),
    responses((status = 200, description = "Guess outcome, rejected guesses change nothing", body = GuessResponse))
)]
pub async fn correct_guess(
    State(state): State<SharedState>,
    Path(device_id): Path<String>,
) -> Result<Json<GuessResponse>, AppError> {
    Ok(Json(session_service::guess(&state, &device_id).await?))
}

/// Close the running round before its countdown expires.
#[utoipa::path(
    post,
    path = "/sessions/{device_id}/end-round",
    tag = "sessions",
    params(("device_id" = String, Path, description = "Device owning the session")),
    responses(
        (status = 200, description = "Round closed", body = SessionView),
        (status = 409, description = "No round in progress")
    )
)]
pub async fn end_round(
    State(state): State<SharedState>,
    Path(device_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::end_round(&state, &device_id).await?))
}

/// Advance to the next round, handing the turn to the other team.
#[utoipa::path(
    post,
    path = "/sessions/{device_id}/next-round",
    tag = "sessions",
    params(("device_id" = String, Path, description = "Device owning the session")),
    responses(
        (status = 200, description = "Next round started or game over", body = SessionView),
        (status = 409, description = "Current round is not closed")
    )
)]
pub async fn next_round(
    State(state): State<SharedState>,
    Path(device_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::next_round(&state, &device_id).await?))
}

/// Restart the game with the same teams.
#[utoipa::path(
    post,
    path = "/sessions/{device_id}/reset",
    tag = "sessions",
    params(("device_id" = String, Path, description = "Device owning the session")),
    responses((status = 200, description = "Session reset", body = SessionView))
)]
pub async fn reset_game(
    State(state): State<SharedState>,
    Path(device_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::reset(&state, &device_id).await?))
}

/// Stream every snapshot of the session, starting with the current one.
#[utoipa::path(
    get,
    path = "/sessions/{device_id}/events",
    tag = "sessions",
    params(("device_id" = String, Path, description = "Device owning the session")),
    responses(
        (status = 200, description = "`session.snapshot` event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Game not found")
    )
)]
pub async fn session_events(
    State(state): State<SharedState>,
    Path(device_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe_session(&state, &device_id).await?;
    info!(%device_id, "new session SSE connection");
    Ok(sse_service::to_sse_stream(receiver, device_id))
}
