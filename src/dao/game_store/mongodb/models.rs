use std::collections::BTreeMap;

use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use crate::dao::models::{GameRecordEntity, RoundScoreEntity};

/// Stored shape of a game record: `_id` is the device id, round keys are strings.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    /// Device owning the game.
    #[serde(rename = "_id")]
    pub device_id: String,
    /// Name of team 1.
    pub team1: String,
    /// Name of team 2.
    pub team2: String,
    /// Scores keyed by round number.
    #[serde_as(as = "BTreeMap<DisplayFromStr, _>")]
    #[serde(default)]
    pub round: BTreeMap<u32, RoundScoreEntity>,
    /// Last write time.
    pub updated_at: DateTime,
}

impl MongoGameDocument {
    /// Document stored under `device_id`.
    pub fn from_entity(device_id: String, record: GameRecordEntity) -> Self {
        Self {
            device_id,
            team1: record.team1,
            team2: record.team2,
            round: record.round,
            updated_at: DateTime::from_system_time(record.updated_at),
        }
    }
}

impl From<MongoGameDocument> for GameRecordEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            team1: value.team1,
            team2: value.team2,
            round: value.round,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

/// Filter selecting the document of `device_id`.
pub fn doc_id(device_id: &str) -> Document {
    doc! { "_id": device_id }
}

/// `$set` update replacing a single round entry.
pub fn set_round_update(round: u32, scores: RoundScoreEntity) -> Document {
    let mut fields = Document::new();
    fields.insert(
        format!("round.{round}"),
        doc! {
            "team1Score": i64::from(scores.team1_score),
            "team2Score": i64::from(scores.team2_score),
        },
    );
    fields.insert("updated_at", DateTime::now());
    doc! { "$set": fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_round_update_targets_round_key() {
        let update = set_round_update(
            3,
            RoundScoreEntity {
                team1_score: 4,
                team2_score: 1,
            },
        );
        let fields = update.get_document("$set").unwrap();
        let round = fields.get_document("round.3").unwrap();
        assert_eq!(round.get_i64("team1Score").unwrap(), 4);
        assert_eq!(round.get_i64("team2Score").unwrap(), 1);
        assert!(fields.contains_key("updated_at"));
    }
}
