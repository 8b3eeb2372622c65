use std::{collections::BTreeMap, time::SystemTime};

use indexmap::IndexMap;

use crate::dao::models::{GameRecordEntity, PersonEntity, RoundScoreEntity};

/// One of the two competing teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    /// Plays odd rounds, starting with round 1.
    One,
    /// Plays even rounds.
    Two,
}

impl Team {
    /// The team playing the following round.
    pub fn other(self) -> Self {
        match self {
            Team::One => Team::Two,
            Team::Two => Team::One,
        }
    }

    /// Numeric label used on the wire (`1` or `2`).
    pub fn number(self) -> u8 {
        match self {
            Team::One => 1,
            Team::Two => 2,
        }
    }

    /// Team whose turn it is on `round`: team 1 opens odd rounds.
    pub fn for_round(round: u32) -> Self {
        if round % 2 == 1 { Team::One } else { Team::Two }
    }
}

/// A person the players have to identify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    /// Stable identifier, unique within the catalog.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Short hint shown under the picture.
    pub description: String,
    /// Reference to the picture (usually a URL).
    pub image: String,
}

/// Ordered, immutable set of persons shared by every session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonCatalog {
    persons: IndexMap<u32, Person>,
}

impl PersonCatalog {
    /// Build a catalog keeping the provider's order. Later duplicates of an id are dropped.
    pub fn new(persons: impl IntoIterator<Item = Person>) -> Self {
        let mut map = IndexMap::new();
        for person in persons {
            map.entry(person.id).or_insert(person);
        }
        Self { persons: map }
    }

    /// Number of persons.
    pub fn len(&self) -> usize {
        self.persons.len()
    }

    /// Whether the catalog holds no person.
    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    /// Every id, in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.persons.keys().copied()
    }

    /// Person with `id`, if any.
    pub fn get(&self, id: u32) -> Option<&Person> {
        self.persons.get(&id)
    }

    /// Position of `id` in catalog order.
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.persons.get_index_of(&id)
    }

    /// Every person, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.persons.values()
    }
}

/// Points earned by each team during a single round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundScore {
    /// Points of team 1.
    pub team1_score: u32,
    /// Points of team 2.
    pub team2_score: u32,
}

impl RoundScore {
    pub(crate) fn credit(&mut self, team: Team) {
        match team {
            Team::One => self.team1_score += 1,
            Team::Two => self.team2_score += 1,
        }
    }
}

/// Cumulative totals derived from the round history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamScores {
    /// Total of team 1.
    pub team1: u32,
    /// Total of team 2.
    pub team2: u32,
}

impl TeamScores {
    /// Winner by strictly greater total; equal totals are a tie.
    pub fn outcome(&self) -> GameOutcome {
        match self.team1.cmp(&self.team2) {
            std::cmp::Ordering::Greater => GameOutcome::Winner(Team::One),
            std::cmp::Ordering::Less => GameOutcome::Winner(Team::Two),
            std::cmp::Ordering::Equal => GameOutcome::Tie,
        }
    }
}

/// Final result displayed once the game is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// One team has a strictly greater total.
    Winner(Team),
    /// Both totals are equal.
    Tie,
}

/// Display names of both teams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamNames {
    /// Name of team 1.
    pub team1: String,
    /// Name of team 2.
    pub team2: String,
}

impl TeamNames {
    /// Pair the two names.
    pub fn new(team1: impl Into<String>, team2: impl Into<String>) -> Self {
        Self {
            team1: team1.into(),
            team2: team2.into(),
        }
    }
}

/// Persisted game record as seen by the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Team names stored with the record.
    pub teams: TeamNames,
    /// Scores keyed by round number.
    pub rounds: BTreeMap<u32, RoundScore>,
    /// Time of the last remote write.
    pub updated_at: SystemTime,
}

impl From<PersonEntity> for Person {
    fn from(value: PersonEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            image: value.image,
        }
    }
}

impl From<Person> for PersonEntity {
    fn from(value: Person) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            image: value.image,
        }
    }
}

impl From<RoundScoreEntity> for RoundScore {
    fn from(value: RoundScoreEntity) -> Self {
        Self {
            team1_score: value.team1_score,
            team2_score: value.team2_score,
        }
    }
}

impl From<RoundScore> for RoundScoreEntity {
    fn from(value: RoundScore) -> Self {
        Self {
            team1_score: value.team1_score,
            team2_score: value.team2_score,
        }
    }
}

impl From<GameRecordEntity> for GameRecord {
    fn from(value: GameRecordEntity) -> Self {
        Self {
            teams: TeamNames::new(value.team1, value.team2),
            rounds: value
                .round
                .into_iter()
                .map(|(round, score)| (round, score.into()))
                .collect(),
            updated_at: value.updated_at,
        }
    }
}
