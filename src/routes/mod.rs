use axum::Router;

use crate::state::SharedState;

/// Device id issuance.
pub mod devices;
/// Swagger UI and the OpenAPI document.
pub mod docs;
/// Stored game records.
pub mod game;
/// Health endpoint.
pub mod health;
/// Person catalog listing.
pub mod persons;
/// Live session actions and events.
pub mod sessions;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(persons::router())
        .merge(devices::router())
        .merge(game::router())
        .merge(sessions::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
