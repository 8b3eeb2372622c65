use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::{game::RoundScoreDto, person::PersonDto},
    state::{
        game::{GameOutcome, RoundScore},
        session::{GuessOutcome, GuessRejection, SessionSnapshot},
        state_machine::{FinishReason, SessionPhase},
    },
};

/// Phase of a session as shown to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhaseDto {
    /// Teams registered, no round played yet.
    NotStarted,
    /// A round is running.
    InProgress,
    /// Round over, summary shown.
    RoundSummary,
    /// Final scoreboard.
    GameOver,
}

impl From<SessionPhase> for SessionPhaseDto {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::NotStarted => SessionPhaseDto::NotStarted,
            SessionPhase::InProgress => SessionPhaseDto::InProgress,
            SessionPhase::RoundSummary => SessionPhaseDto::RoundSummary,
            SessionPhase::GameOver => SessionPhaseDto::GameOver,
        }
    }
}

/// Why the game ended.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FinishReasonDto {
    /// Every person was guessed.
    PoolExhausted,
    /// The last round was played.
    MaxRoundsReached,
}

impl From<FinishReason> for FinishReasonDto {
    fn from(value: FinishReason) -> Self {
        match value {
            FinishReason::PoolExhausted => FinishReasonDto::PoolExhausted,
            FinishReason::MaxRoundsReached => FinishReasonDto::MaxRoundsReached,
        }
    }
}

/// Cumulative totals of both teams.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
pub struct TotalsDto {
    /// Points of team 1.
    pub team1: u32,
    /// Points of team 2.
    pub team2: u32,
}

/// Final result; `winner` is absent on a tie.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
pub struct OutcomeDto {
    /// Winning team, `1` or `2`.
    pub winner: Option<u8>,
    /// Both teams have the same total.
    pub tie: bool,
}

impl From<GameOutcome> for OutcomeDto {
    fn from(value: GameOutcome) -> Self {
        match value {
            GameOutcome::Winner(team) => Self {
                winner: Some(team.number()),
                tie: false,
            },
            GameOutcome::Tie => Self {
                winner: None,
                tie: true,
            },
        }
    }
}

impl From<RoundScore> for RoundScoreDto {
    fn from(value: RoundScore) -> Self {
        Self {
            team1_score: value.team1_score,
            team2_score: value.team2_score,
        }
    }
}

/// Full view of a session; also the payload of `session.snapshot` events.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Device owning the session.
    pub device_id: String,
    /// Name of team 1.
    pub team1: String,
    /// Name of team 2.
    pub team2: String,
    /// Current phase.
    pub phase: SessionPhaseDto,
    /// Increments on every phase transition.
    pub version: usize,
    /// Active (or last played) round, starting at 1.
    pub current_round: u32,
    /// Rounds after which the game ends.
    pub max_rounds: u32,
    /// `1` or `2`.
    pub team_turn: u8,
    /// Seconds left in the round.
    pub time_left: u32,
    /// Round length in seconds.
    pub round_duration: u32,
    /// Whether the round summary is shown.
    pub is_drawer_open: bool,
    /// Whether the game reached its end.
    pub is_game_over: bool,
    /// Whether the person catalog is attached.
    pub catalog_ready: bool,
    /// Ids not yet guessed in the current rotation, ascending.
    pub remaining_person_ids: Vec<u32>,
    /// Position of the current person in the catalog.
    pub current_person_index: Option<usize>,
    /// Person to make the team guess.
    pub current_person: Option<PersonDto>,
    /// Score history keyed by round number.
    pub round_scores: BTreeMap<u32, RoundScoreDto>,
    /// Totals folded over the history.
    pub totals: TotalsDto,
    /// Why the game ended, once over.
    pub finish_reason: Option<FinishReasonDto>,
    /// Winner or tie, once over.
    pub outcome: Option<OutcomeDto>,
}

impl From<SessionSnapshot> for SessionView {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            device_id: snapshot.device_id,
            team1: snapshot.teams.team1,
            team2: snapshot.teams.team2,
            phase: snapshot.phase.into(),
            version: snapshot.version,
            current_round: snapshot.current_round,
            max_rounds: snapshot.max_rounds,
            team_turn: snapshot.team_turn.number(),
            time_left: snapshot.time_left,
            round_duration: snapshot.round_duration,
            is_drawer_open: snapshot.is_drawer_open,
            is_game_over: snapshot.is_game_over,
            catalog_ready: snapshot.catalog_ready,
            remaining_person_ids: snapshot.remaining_person_ids,
            current_person_index: snapshot.current_person_index,
            current_person: snapshot.current_person.as_ref().map(PersonDto::from),
            round_scores: snapshot
                .round_scores
                .into_iter()
                .map(|(round, score)| (round, score.into()))
                .collect(),
            totals: TotalsDto {
                team1: snapshot.totals.team1,
                team2: snapshot.totals.team2,
            },
            finish_reason: snapshot.finish_reason.map(Into::into),
            outcome: snapshot.outcome.map(Into::into),
        }
    }
}

/// Why a guess changed nothing.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GuessRejectionDto {
    /// No round is running.
    NotInProgress,
    /// The countdown already reached zero.
    TimeExpired,
    /// The pool ran out during the round.
    NoPersonAvailable,
    /// The session was replaced by a new game.
    SessionClosed,
}

impl From<GuessRejection> for GuessRejectionDto {
    fn from(value: GuessRejection) -> Self {
        match value {
            GuessRejection::NotInProgress => GuessRejectionDto::NotInProgress,
            GuessRejection::TimeExpired => GuessRejectionDto::TimeExpired,
            GuessRejection::NoPersonAvailable => GuessRejectionDto::NoPersonAvailable,
            GuessRejection::SessionClosed => GuessRejectionDto::SessionClosed,
        }
    }
}

/// Result of a correct-guess action; rejected guesses change nothing.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuessResponse {
    /// Whether the guess was credited.
    pub accepted: bool,
    /// Why the guess was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<GuessRejectionDto>,
    /// Session after the action.
    pub session: SessionView,
}

impl GuessResponse {
    /// Response for `outcome`.
    pub fn new(outcome: GuessOutcome, session: SessionView) -> Self {
        match outcome {
            GuessOutcome::Accepted { .. } => Self {
                accepted: true,
                reason: None,
                session,
            },
            GuessOutcome::Rejected(rejection) => Self {
                accepted: false,
                reason: Some(rejection.into()),
                session,
            },
        }
    }
}
