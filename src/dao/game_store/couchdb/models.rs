use std::{collections::BTreeMap, time::SystemTime};

use serde::{Deserialize, Serialize};

use crate::dao::models::{GameRecordEntity, RoundScoreEntity};

/// Prefix of every game document id.
pub const GAME_PREFIX: &str = "game::";

/// Document id of the game record of `device_id`.
pub fn game_doc_id(device_id: &str) -> String {
    format!("{GAME_PREFIX}{device_id}")
}

/// Stored shape of a game record; `_rev` is kept for updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    /// `game::<device id>`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Current revision, absent on creation.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Name of team 1.
    pub team1: String,
    /// Name of team 2.
    pub team2: String,
    /// Scores keyed by round number.
    #[serde(default)]
    pub round: BTreeMap<u32, RoundScoreEntity>,
    /// Last write time.
    pub updated_at: SystemTime,
}

impl CouchGameDocument {
    /// Document for `record`, carrying `rev` when replacing.
    pub fn from_entity(device_id: &str, record: GameRecordEntity, rev: Option<String>) -> Self {
        Self {
            id: game_doc_id(device_id),
            rev,
            team1: record.team1,
            team2: record.team2,
            round: record.round,
            updated_at: record.updated_at,
        }
    }

    /// Drop the CouchDB metadata.
    pub fn into_entity(self) -> GameRecordEntity {
        GameRecordEntity {
            team1: self.team1,
            team2: self.team2,
            round: self.round,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_keys_round_trip_as_strings() {
        let mut record = GameRecordEntity::fresh("Reds", "Blues");
        record.set_round(
            2,
            RoundScoreEntity {
                team1_score: 0,
                team2_score: 5,
            },
        );
        let document = CouchGameDocument::from_entity("dev-1", record, None);

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["_id"], "game::dev-1");
        assert!(json.get("_rev").is_none());
        assert_eq!(json["round"]["2"]["team2Score"], 5);

        let parsed: CouchGameDocument = serde_json::from_value(json).unwrap();
        let entity = parsed.into_entity();
        assert_eq!(entity.round[&2].team2_score, 5);
        assert_eq!(entity.round[&1], RoundScoreEntity::default());
    }
}
