use std::{collections::BTreeMap, sync::Arc};

use rand::rngs::StdRng;
use thiserror::Error;
use tracing::debug;

use crate::{
    config::GameRules,
    state::{
        game::{
            GameOutcome, GameRecord, Person, PersonCatalog, RoundScore, Team, TeamNames,
            TeamScores,
        },
        ledger::ScoreLedger,
        pool::PersonPool,
        state_machine::{
            FinishReason, InvalidTransition, RoundEndReason, SessionEvent, SessionPhase,
            SessionStateMachine,
        },
        timer::{RoundTimer, TickOutcome},
    },
};

/// Failures of session transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The requested transition is not valid from the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The person catalog has not been loaded yet.
    #[error("person catalog is still loading")]
    CatalogPending,
    /// The catalog holds no person, so no round can ever be played.
    #[error("person catalog is empty")]
    CatalogEmpty,
    /// The session was replaced or evicted and accepts no more actions.
    #[error("session is closed")]
    Closed,
}

/// Why a guess was dropped without changing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessRejection {
    /// No round is running.
    NotInProgress,
    /// The countdown already reached zero.
    TimeExpired,
    /// The pool ran out during the round.
    NoPersonAvailable,
    /// The session was replaced or evicted.
    SessionClosed,
}

/// Result of a correct-guess action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// The turn team scored; `score` is the new value of the active round.
    Accepted {
        /// Round that was credited.
        round: u32,
        /// Score of that round after the credit.
        score: RoundScore,
    },
    /// Nothing changed.
    Rejected(GuessRejection),
}

/// Round that just moved to the summary and must be flushed to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedRound {
    /// Number of the closed round.
    pub round: u32,
    /// Final score of the round.
    pub score: RoundScore,
    /// Timer expiry or manual end.
    pub reason: RoundEndReason,
}

/// Result of dismissing the round summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRoundOutcome {
    /// A new round is running; `timer_generation` tags its ticker.
    Started {
        /// Number of the new round.
        round: u32,
        /// Team playing it.
        team: Team,
        /// Generation of the re-armed timer.
        timer_generation: u64,
    },
    /// No round can follow; the game is over.
    Finished(FinishReason),
}

/// Result of feeding a real-time tick to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// One second elapsed; carries the seconds left.
    Ticked(u32),
    /// The countdown reached zero and the round moved to the summary.
    Expired(ClosedRound),
    /// The session is not counting down.
    Ignored,
    /// The tick belongs to a superseded round.
    Stale,
}

/// Read-only view of a session handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Device owning the session.
    pub device_id: String,
    /// Names of both teams.
    pub teams: TeamNames,
    /// Current phase.
    pub phase: SessionPhase,
    /// Number of applied phase transitions.
    pub version: usize,
    /// Active (or last played) round, starting at 1.
    pub current_round: u32,
    /// Rounds after which the game ends.
    pub max_rounds: u32,
    /// Team whose turn it is.
    pub team_turn: Team,
    /// Seconds left in the round.
    pub time_left: u32,
    /// Configured round length in seconds.
    pub round_duration: u32,
    /// Whether the round summary is shown.
    pub is_drawer_open: bool,
    /// Whether the game reached its end.
    pub is_game_over: bool,
    /// Whether the person catalog is attached.
    pub catalog_ready: bool,
    /// Ids not yet guessed in the current rotation, ascending.
    pub remaining_person_ids: Vec<u32>,
    /// Catalog position of the person currently shown.
    pub current_person_index: Option<usize>,
    /// Person currently shown.
    pub current_person: Option<Person>,
    /// Score history keyed by round number.
    pub round_scores: BTreeMap<u32, RoundScore>,
    /// Totals folded over the history.
    pub totals: TeamScores,
    /// Why the game ended, once over.
    pub finish_reason: Option<FinishReason>,
    /// Winner or tie, once over.
    pub outcome: Option<GameOutcome>,
}

/// Round and scoring state of one device's game.
///
/// Every method is synchronous and performs a single state change; the async
/// owner serialises calls and drives [`GameSession::tick`] from a real-time
/// ticker.
#[derive(Debug)]
pub struct GameSession {
    device_id: String,
    teams: TeamNames,
    rules: GameRules,
    catalog: Option<Arc<PersonCatalog>>,
    machine: SessionStateMachine,
    pool: PersonPool,
    ledger: ScoreLedger,
    timer: RoundTimer,
    team_turn: Team,
    current_person: Option<u32>,
    finish_reason: Option<FinishReason>,
    rng: StdRng,
}

impl GameSession {
    /// Build a session in the not-started phase with round 1 zeroed.
    pub fn new(device_id: String, teams: TeamNames, rules: GameRules, rng: StdRng) -> Self {
        Self {
            device_id,
            teams,
            rules,
            catalog: None,
            machine: SessionStateMachine::new(),
            pool: PersonPool::default(),
            ledger: ScoreLedger::new(),
            timer: RoundTimer::new(rules.round_duration_secs),
            team_turn: Team::One,
            current_person: None,
            finish_reason: None,
            rng,
        }
    }

    /// Rebuild a session from a persisted record.
    ///
    /// A record that never got past an untouched round 1 is restored as not
    /// started. Otherwise the session reopens the summary of the last stored
    /// round so the players can continue with the next one.
    ///
    /// Only round scores are persisted. The pool comes back full and the finish
    /// reason is not kept, so a game that ended by pool exhaustion reopens in
    /// the summary and can be played on. A game at `max_rounds` ends again on
    /// the next `next_round`.
    pub fn restore(
        device_id: String,
        record: &GameRecord,
        rules: GameRules,
        catalog: Option<Arc<PersonCatalog>>,
        rng: StdRng,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(device_id, record.teams.clone(), rules, rng);
        if let Some(catalog) = catalog {
            session.attach_catalog(catalog);
        }

        let ledger = ScoreLedger::from_rounds(&record.rounds);
        let untouched =
            ledger.current_round() == 1 && ledger.current_score() == RoundScore::default();
        if untouched {
            return Ok(session);
        }

        session.machine.apply(SessionEvent::Start)?;
        session
            .machine
            .apply(SessionEvent::RoundEnded(RoundEndReason::TimerExpired))?;
        session.team_turn = Team::for_round(ledger.current_round());
        session.ledger = ledger;
        session.timer.expire();
        Ok(session)
    }

    /// Attach the catalog once it is available. Later calls are ignored.
    pub fn attach_catalog(&mut self, catalog: Arc<PersonCatalog>) {
        if self.catalog.is_some() {
            return;
        }
        self.pool = PersonPool::new(catalog.ids());
        self.catalog = Some(catalog);
    }

    /// Start round 1 for team 1, returning the generation of the round timer.
    pub fn start(&mut self) -> Result<u64, SessionError> {
        let catalog = self.catalog.clone().ok_or(SessionError::CatalogPending)?;
        if catalog.is_empty() {
            return Err(SessionError::CatalogEmpty);
        }

        self.machine.apply(SessionEvent::Start)?;
        self.ledger = ScoreLedger::new();
        self.pool.replenish(catalog.ids());
        self.team_turn = Team::One;
        self.finish_reason = None;
        let generation = self.timer.reset(self.rules.round_duration_secs);
        self.timer.start();
        self.draw_person();
        Ok(generation)
    }

    /// Credit the turn team for the person currently shown and draw the next one.
    pub fn correct_guess(&mut self) -> GuessOutcome {
        if self.machine.phase() != SessionPhase::InProgress {
            return GuessOutcome::Rejected(GuessRejection::NotInProgress);
        }
        if self.timer.time_left() == 0 {
            return GuessOutcome::Rejected(GuessRejection::TimeExpired);
        }
        let Some(person_id) = self.current_person else {
            return GuessOutcome::Rejected(GuessRejection::NoPersonAvailable);
        };

        let round = self.ledger.current_round();
        let Some(score) = self.ledger.credit_guess(round, self.team_turn) else {
            return GuessOutcome::Rejected(GuessRejection::NotInProgress);
        };

        self.pool.consume(person_id);
        self.draw_person();
        GuessOutcome::Accepted { round, score }
    }

    /// Close the active round and open the summary.
    pub fn end_round(&mut self, reason: RoundEndReason) -> Result<ClosedRound, SessionError> {
        self.machine.apply(SessionEvent::RoundEnded(reason))?;
        self.timer.pause();
        Ok(ClosedRound {
            round: self.ledger.current_round(),
            score: self.ledger.current_score(),
            reason,
        })
    }

    /// Dismiss the summary: either start the next round or finish the game.
    ///
    /// Pool exhaustion is checked before the low-water replenishment so an
    /// emptied rotation always ends the game.
    pub fn next_round(&mut self) -> Result<NextRoundOutcome, SessionError> {
        let from = self.machine.phase();
        if from != SessionPhase::RoundSummary {
            return Err(InvalidTransition {
                from,
                event: SessionEvent::NextRound,
            }
            .into());
        }

        let finish = if self.pool.is_empty() {
            Some(FinishReason::PoolExhausted)
        } else if self.ledger.current_round() + 1 > self.rules.max_rounds {
            Some(FinishReason::MaxRoundsReached)
        } else {
            None
        };

        if let Some(reason) = finish {
            self.machine.apply(SessionEvent::Finish(reason))?;
            self.finish_reason = Some(reason);
            self.current_person = None;
            return Ok(NextRoundOutcome::Finished(reason));
        }

        self.machine.apply(SessionEvent::NextRound)?;
        let round = self.ledger.advance_round();
        self.team_turn = self.team_turn.other();
        let timer_generation = self.timer.reset(self.rules.round_duration_secs);
        self.timer.start();

        if self.pool.needs_replenish(self.rules.low_water_mark) {
            if let Some(catalog) = &self.catalog {
                debug!(
                    device_id = %self.device_id,
                    remaining = self.pool.len(),
                    "replenishing person pool"
                );
                self.pool.replenish(catalog.ids());
            }
        }
        self.draw_person();

        Ok(NextRoundOutcome::Started {
            round,
            team: self.team_turn,
            timer_generation,
        })
    }

    /// Return every field to its round-one default, keeping the catalog.
    pub fn reset(&mut self) -> u64 {
        // Reset is valid from every phase.
        let _ = self.machine.apply(SessionEvent::Reset);
        self.ledger = ScoreLedger::new();
        if let Some(catalog) = &self.catalog {
            self.pool.replenish(catalog.ids());
        }
        self.team_turn = Team::One;
        self.current_person = None;
        self.finish_reason = None;
        self.timer.reset(self.rules.round_duration_secs)
    }

    /// Feed one second of real time from the ticker tagged `generation`.
    pub fn tick(&mut self, generation: u64) -> TickResult {
        if generation != self.timer.generation() {
            return TickResult::Stale;
        }
        if self.machine.phase() != SessionPhase::InProgress {
            return TickResult::Ignored;
        }

        match self.timer.tick() {
            TickOutcome::Ticked(left) => TickResult::Ticked(left),
            TickOutcome::Expired => match self.end_round(RoundEndReason::TimerExpired) {
                Ok(closed) => TickResult::Expired(closed),
                Err(_) => TickResult::Ignored,
            },
            TickOutcome::Ignored => TickResult::Ignored,
        }
    }

    fn draw_person(&mut self) {
        self.current_person = self.pool.select_next(&mut self.rng);
    }

    /// Device owning the session.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Names of both teams.
    pub fn teams(&self) -> &TeamNames {
        &self.teams
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Active (or last played) round.
    pub fn current_round(&self) -> u32 {
        self.ledger.current_round()
    }

    /// Team whose turn it is.
    pub fn team_turn(&self) -> Team {
        self.team_turn
    }

    /// Seconds left in the round.
    pub fn time_left(&self) -> u32 {
        self.timer.time_left()
    }

    /// Generation tag of the round timer.
    pub fn timer_generation(&self) -> u64 {
        self.timer.generation()
    }

    /// Whether the countdown is running.
    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Whether the game reached its end.
    pub fn is_game_over(&self) -> bool {
        self.machine.phase() == SessionPhase::GameOver
    }

    /// Whether a catalog is attached.
    pub fn has_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    /// Totals folded over every round.
    pub fn totals(&self) -> TeamScores {
        self.ledger.totals()
    }

    /// Score ledger.
    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Pool of persons not yet guessed.
    pub fn pool(&self) -> &PersonPool {
        &self.pool
    }

    /// Person currently shown, if any.
    pub fn current_person(&self) -> Option<&Person> {
        let id = self.current_person?;
        self.catalog.as_ref()?.get(id)
    }

    /// Read-only view for the presentation layer.
    pub fn snapshot(&self) -> SessionSnapshot {
        let phase = self.machine.phase();
        let totals = self.ledger.totals();
        let current_person = self.current_person().cloned();
        let current_person_index = self
            .current_person
            .zip(self.catalog.as_ref())
            .and_then(|(id, catalog)| catalog.index_of(id));

        SessionSnapshot {
            device_id: self.device_id.clone(),
            teams: self.teams.clone(),
            phase,
            version: self.machine.snapshot().version,
            current_round: self.ledger.current_round(),
            max_rounds: self.rules.max_rounds,
            team_turn: self.team_turn,
            time_left: self.timer.time_left(),
            round_duration: self.timer.duration(),
            is_drawer_open: phase.is_drawer_open(),
            is_game_over: phase == SessionPhase::GameOver,
            catalog_ready: self.catalog.is_some(),
            remaining_person_ids: self.pool.ids(),
            current_person_index,
            current_person,
            round_scores: self.ledger.rounds().clone(),
            totals,
            finish_reason: self.finish_reason,
            outcome: (phase == SessionPhase::GameOver).then(|| totals.outcome()),
        }
    }
}
