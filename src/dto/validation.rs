//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest device id accepted from clients.
pub const MAX_DEVICE_ID_LEN: usize = 128;
/// Longest team name accepted from clients.
pub const MAX_TEAM_NAME_LEN: usize = 64;

/// Device ids are opaque: 1 to 128 characters without whitespace or control characters.
///
/// ```ignore
/// validate_device_id("3f2c1a8e-6d3b-4f7e-9c1a-0b2d4e6f8a10") // Ok
/// validate_device_id("living room")                          // Err - whitespace
/// ```
pub fn validate_device_id(id: &str) -> Result<(), ValidationError> {
    let len = id.chars().count();
    if len == 0 || len > MAX_DEVICE_ID_LEN {
        let mut err = ValidationError::new("device_id_length");
        err.message = Some(
            format!("Device ID must be 1 to {MAX_DEVICE_ID_LEN} characters (got {len})").into(),
        );
        return Err(err);
    }

    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        let mut err = ValidationError::new("device_id_format");
        err.message = Some("Device ID must not contain whitespace or control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Team names must contain something besides whitespace and stay short enough to display.
pub fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("team_name_empty");
        err.message = Some("Team name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > MAX_TEAM_NAME_LEN {
        let mut err = ValidationError::new("team_name_length");
        err.message =
            Some(format!("Team name must be at most {MAX_TEAM_NAME_LEN} characters").into());
        return Err(err);
    }

    Ok(())
}
