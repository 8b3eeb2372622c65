use std::{collections::BTreeMap, time::SystemTime};

use serde::{Deserialize, Serialize};

/// Person record as returned by the catalog provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonEntity {
    /// Stable identifier, unique within the catalog.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Short hint shown under the picture.
    pub description: String,
    /// Reference to the picture (usually a URL).
    pub image: String,
}

/// Points earned by both teams during one round.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundScoreEntity {
    /// Points of team 1.
    pub team1_score: u32,
    /// Points of team 2.
    pub team2_score: u32,
}

/// Game record persisted under a device identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRecordEntity {
    /// Display name of the first team.
    pub team1: String,
    /// Display name of the second team.
    pub team2: String,
    /// Scores keyed by round number, starting at 1.
    pub round: BTreeMap<u32, RoundScoreEntity>,
    /// Last time the record was written.
    pub updated_at: SystemTime,
}

impl GameRecordEntity {
    /// A brand-new record with a zeroed round 1.
    pub fn fresh(team1: impl Into<String>, team2: impl Into<String>) -> Self {
        let mut round = BTreeMap::new();
        round.insert(1, RoundScoreEntity::default());
        Self {
            team1: team1.into(),
            team2: team2.into(),
            round,
            updated_at: SystemTime::now(),
        }
    }

    /// Replace the entry of `round_number` in place.
    pub fn set_round(&mut self, round_number: u32, scores: RoundScoreEntity) {
        self.round.insert(round_number, scores);
        self.updated_at = SystemTime::now();
    }
}
