use axum::{Json, Router, routing::post};

use crate::{dto::device::DeviceResponse, services::device_service, state::SharedState};

/// Device registration.
pub fn router() -> Router<SharedState> {
    Router::new().route("/devices", post(register_device))
}

/// Issue a new random device identifier.
#[utoipa::path(
    post,
    path = "/devices",
    tag = "devices",
    responses((status = 200, description = "Device identifier issued", body = DeviceResponse))
)]
pub async fn register_device() -> Json<DeviceResponse> {
    Json(device_service::issue_device_id())
}
