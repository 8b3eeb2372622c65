use serde::Serialize;
use utoipa::ToSchema;

/// Load state of the person catalog as reported by `/healthcheck`.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CatalogStatus {
    /// Still being fetched.
    Loading,
    /// Loaded and attached to sessions.
    Ready,
    /// Loading failed; `start` is refused.
    Failed,
}

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while no storage backend is reachable.
    pub status: String,
    /// Load state of the person catalog.
    pub catalog: CatalogStatus,
}

impl HealthResponse {
    /// Healthy response.
    pub fn ok(catalog: CatalogStatus) -> Self {
        Self {
            status: "ok".to_string(),
            catalog,
        }
    }

    /// Response while running without storage.
    pub fn degraded(catalog: CatalogStatus) -> Self {
        Self {
            status: "degraded".to_string(),
            catalog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_status_and_catalog() {
        let json = serde_json::to_value(HealthResponse::degraded(CatalogStatus::Loading)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "degraded", "catalog": "loading" }));
    }
}
