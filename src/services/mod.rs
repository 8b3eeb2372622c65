/// Person catalog loading and listing.
pub mod catalog_service;
/// Device identity issuance.
pub mod device_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Stored game records (create, read, round update).
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Live session lookup, restoration and actions.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming for session snapshots.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Debounced persistence of per-round scores.
pub mod sync_service;
