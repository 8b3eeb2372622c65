use tracing::debug;
use uuid::Uuid;

use crate::dto::device::DeviceResponse;

/// Issue a random device identifier.
pub fn issue_device_id() -> DeviceResponse {
    let device_id = Uuid::new_v4().to_string();
    debug!(%device_id, "issued device id");
    DeviceResponse { device_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::validation::validate_device_id;

    #[test]
    fn issued_ids_are_distinct_and_valid() {
        let first = issue_device_id().device_id;
        let second = issue_device_id().device_id;
        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
        assert!(validate_device_id(&first).is_ok());
    }
}
