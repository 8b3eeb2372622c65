//! Library crate for guess-party-back, exposing modules for binaries and integration tests.

/// Configuration file loading.
pub mod config;
/// Storage backends and the person catalog.
pub mod dao;
/// HTTP request and response types.
pub mod dto;
/// Error types and their HTTP mapping.
pub mod error;
/// Axum routers.
pub mod routes;
/// Application services behind the routes.
pub mod services;
/// Shared state and the session engine.
pub mod state;
