use std::collections::BTreeMap;

use crate::state::game::{RoundScore, Team, TeamScores};

/// Per-round score history of a session.
///
/// Only the active round accepts credits; earlier rounds are frozen once the
/// ledger advances. Totals are always folded from the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreLedger {
    rounds: BTreeMap<u32, RoundScore>,
    current_round: u32,
}

impl Default for ScoreLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreLedger {
    /// Fresh ledger with a zeroed round 1.
    pub fn new() -> Self {
        let mut rounds = BTreeMap::new();
        rounds.insert(1, RoundScore::default());
        Self {
            rounds,
            current_round: 1,
        }
    }

    /// Rebuild a ledger from persisted history.
    ///
    /// Only the gapless prefix starting at round 1 is kept; the highest round
    /// of that prefix becomes the active one.
    pub fn from_rounds(rounds: &BTreeMap<u32, RoundScore>) -> Self {
        let mut kept = BTreeMap::new();
        let mut expected = 1;
        for (&round, &score) in rounds {
            if round != expected {
                break;
            }
            kept.insert(round, score);
            expected += 1;
        }

        if kept.is_empty() {
            return Self::new();
        }

        let current_round = expected - 1;
        Self {
            rounds: kept,
            current_round,
        }
    }

    /// Credit one point to `team` for `round`.
    ///
    /// Returns the updated score of the round, or `None` when `round` is not
    /// the active round.
    pub fn credit_guess(&mut self, round: u32, team: Team) -> Option<RoundScore> {
        if round != self.current_round {
            return None;
        }

        let score = self.rounds.entry(round).or_default();
        score.credit(team);
        Some(*score)
    }

    /// Seed the following round with zeroed scores and make it active.
    pub fn advance_round(&mut self) -> u32 {
        self.current_round += 1;
        self.rounds.entry(self.current_round).or_default();
        self.current_round
    }

    /// Totals folded over every round.
    pub fn totals(&self) -> TeamScores {
        self.rounds
            .values()
            .fold(TeamScores::default(), |acc, score| TeamScores {
                team1: acc.team1 + score.team1_score,
                team2: acc.team2 + score.team2_score,
            })
    }

    /// Active round, starting at 1.
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Score of the active round.
    pub fn current_score(&self) -> RoundScore {
        self.round(self.current_round).unwrap_or_default()
    }

    /// Score of `round`, if it exists.
    pub fn round(&self, round: u32) -> Option<RoundScore> {
        self.rounds.get(&round).copied()
    }

    /// Every round in ascending order.
    pub fn rounds(&self) -> &BTreeMap<u32, RoundScore> {
        &self.rounds
    }
}
