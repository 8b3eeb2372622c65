use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::person::PersonDto, error::AppError, services::catalog_service, state::SharedState,
};

/// Read-only access to the person catalog.
pub fn router() -> Router<SharedState> {
    Router::new().route("/persons", get(list_persons))
}

/// List every person of the catalog.
#[utoipa::path(
    get,
    path = "/persons",
    tag = "persons",
    responses(
        (status = 200, description = "Catalog in load order", body = [PersonDto]),
        (status = 503, description = "Catalog still loading or failed to load")
    )
)]
pub async fn list_persons(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PersonDto>>, AppError> {
    Ok(Json(catalog_service::persons(&state)?))
}
