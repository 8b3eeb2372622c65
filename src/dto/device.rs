use serde::Serialize;
use utoipa::ToSchema;

/// Freshly issued device identity.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    /// Identifier to send with every later request.
    pub device_id: String,
}
