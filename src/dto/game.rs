use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::{GameRecordEntity, RoundScoreEntity},
    dto::{
        format_system_time,
        validation::{validate_device_id, validate_team_name},
    },
};

/// Payload creating (or replacing) the game of a device.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Device owning the game.
    #[validate(custom(function = "validate_device_id"))]
    pub device_id: String,
    /// Name of team 1.
    #[validate(custom(function = "validate_team_name"))]
    pub team1: String,
    /// Name of team 2.
    #[validate(custom(function = "validate_team_name"))]
    pub team2: String,
}

/// Query string selecting a device's game.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeviceQuery {
    /// Device owning the game.
    #[validate(custom(function = "validate_device_id"))]
    pub device_id: String,
}

/// Payload replacing the scores of one round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoundRequest {
    /// Device owning the game.
    #[validate(custom(function = "validate_device_id"))]
    pub device_id: String,
    /// Round to replace, starting at 1.
    #[validate(range(min = 1))]
    pub round_number: u32,
    /// Points of team 1.
    pub team1_score: u32,
    /// Points of team 2.
    pub team2_score: u32,
}

impl UpdateRoundRequest {
    /// Scores as a storage entity.
    pub fn scores(&self) -> RoundScoreEntity {
        RoundScoreEntity {
            team1_score: self.team1_score,
            team2_score: self.team2_score,
        }
    }
}

/// Scores of one round as exchanged with clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundScoreDto {
    /// Points of team 1.
    pub team1_score: u32,
    /// Points of team 2.
    pub team2_score: u32,
}

impl From<RoundScoreEntity> for RoundScoreDto {
    fn from(value: RoundScoreEntity) -> Self {
        Self {
            team1_score: value.team1_score,
            team2_score: value.team2_score,
        }
    }
}

/// Stored game record of a device.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameRecordResponse {
    /// Device owning the game.
    pub device_id: String,
    /// Name of team 1.
    pub team1: String,
    /// Name of team 2.
    pub team2: String,
    /// Scores keyed by round number.
    pub round: BTreeMap<u32, RoundScoreDto>,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
}

impl GameRecordResponse {
    /// Response for the record stored under `device_id`.
    pub fn new(device_id: String, record: GameRecordEntity) -> Self {
        Self {
            device_id,
            team1: record.team1,
            team2: record.team2,
            round: record
                .round
                .into_iter()
                .map(|(round, score)| (round, score.into()))
                .collect(),
            updated_at: format_system_time(record.updated_at),
        }
    }
}

/// Acknowledgement of a round update.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoundResponse {
    /// Device owning the game.
    pub device_id: String,
    /// Replaced round.
    pub round_number: u32,
    /// Points of team 1.
    pub team1_score: u32,
    /// Points of team 2.
    pub team2_score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uses_camel_case_and_validates() {
        let request: CreateGameRequest = serde_json::from_str(
            r#"{ "deviceId": "tablet-1", "team1": "Reds", "team2": "Blues" }"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());

        let invalid: CreateGameRequest =
            serde_json::from_str(r#"{ "deviceId": "tab let", "team1": " ", "team2": "Blues" }"#)
                .unwrap();
        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("device_id"));
        assert!(fields.contains_key("team1"));
    }

    #[test]
    fn round_zero_is_rejected() {
        let request: UpdateRoundRequest = serde_json::from_str(
            r#"{ "deviceId": "tablet-1", "roundNumber": 0, "team1Score": 1, "team2Score": 0 }"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn record_response_serialises_round_map() {
        let record = GameRecordEntity::fresh("Reds", "Blues");
        let json = serde_json::to_value(GameRecordResponse::new("tablet-1".into(), record)).unwrap();
        assert_eq!(json["deviceId"], "tablet-1");
        assert_eq!(json["round"]["1"]["team1Score"], 0);
        assert!(json["updatedAt"].as_str().unwrap().contains('T'));
    }
}
