use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Device identity payloads.
pub mod device;
/// Stored game payloads.
pub mod game;
/// Health payloads.
pub mod health;
/// Person payloads.
pub mod person;
/// Live session payloads.
pub mod session;
/// Server-sent event envelope.
pub mod sse;
/// Shared field validators.
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
