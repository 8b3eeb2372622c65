use thiserror::Error;

/// High-level phases a session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Teams are registered; waiting for the players to start.
    NotStarted,
    /// A round is being played and guesses are accepted.
    InProgress,
    /// The round is over and the summary drawer is open.
    RoundSummary,
    /// Final scoreboard; only a reset leaves this phase.
    GameOver,
}

impl SessionPhase {
    /// The summary drawer is shown in these phases.
    pub fn is_drawer_open(self) -> bool {
        matches!(self, SessionPhase::RoundSummary)
    }
}

/// Why a round stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEndReason {
    /// The countdown reached zero.
    TimerExpired,
    /// Players asked for the next round before time ran out.
    Manual,
}

/// Why the game reached the final scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Every person of the rotation has been guessed.
    PoolExhausted,
    /// The configured number of rounds has been played.
    MaxRoundsReached,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Players start the first round.
    Start,
    /// The active round stopped and the summary opens.
    RoundEnded(RoundEndReason),
    /// The summary is dismissed and the next team plays.
    NextRound,
    /// The summary is dismissed and no further round is possible.
    Finish(FinishReason),
    /// Everything goes back to round-one defaults.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: SessionPhase,
    /// Increments on each applied transition.
    pub version: usize,
}

/// State machine implementing the round flow of a session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::NotStarted,
            version: 0,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the not-started phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Phase and version as a value.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
        }
    }

    /// Check an event against the current phase without applying it.
    pub fn can_apply(&self, event: SessionEvent) -> bool {
        self.compute_transition(event).is_ok()
    }

    /// Validate and apply `event`, returning the new phase.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::NotStarted, SessionEvent::Start) => SessionPhase::InProgress,
            (SessionPhase::InProgress, SessionEvent::RoundEnded(_)) => SessionPhase::RoundSummary,
            (SessionPhase::RoundSummary, SessionEvent::NextRound) => SessionPhase::InProgress,
            (SessionPhase::RoundSummary, SessionEvent::Finish(_)) => SessionPhase::GameOver,
            (_, SessionEvent::Reset) => SessionPhase::NotStarted,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_not_started() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::NotStarted);
        assert_eq!(sm.snapshot().version, 0);
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(apply(&mut sm, SessionEvent::Start), SessionPhase::InProgress);
        assert_eq!(
            apply(
                &mut sm,
                SessionEvent::RoundEnded(RoundEndReason::TimerExpired)
            ),
            SessionPhase::RoundSummary
        );
        assert!(sm.phase().is_drawer_open());
        assert_eq!(apply(&mut sm, SessionEvent::NextRound), SessionPhase::InProgress);
        assert_eq!(
            apply(&mut sm, SessionEvent::RoundEnded(RoundEndReason::Manual)),
            SessionPhase::RoundSummary
        );
        assert_eq!(
            apply(
                &mut sm,
                SessionEvent::Finish(FinishReason::MaxRoundsReached)
            ),
            SessionPhase::GameOver
        );
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::NotStarted);
        assert_eq!(sm.snapshot().version, 6);
    }

    #[test]
    fn game_over_only_accepts_reset() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::RoundEnded(RoundEndReason::Manual));
        apply(&mut sm, SessionEvent::Finish(FinishReason::PoolExhausted));

        for event in [
            SessionEvent::Start,
            SessionEvent::NextRound,
            SessionEvent::RoundEnded(RoundEndReason::TimerExpired),
            SessionEvent::Finish(FinishReason::PoolExhausted),
        ] {
            let err = sm.apply(event).unwrap_err();
            assert_eq!(err.from, SessionPhase::GameOver);
            assert_eq!(err.event, event);
        }
        assert!(sm.can_apply(SessionEvent::Reset));
    }

    #[test]
    fn round_cannot_end_twice() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::RoundEnded(RoundEndReason::TimerExpired));

        let err = sm
            .apply(SessionEvent::RoundEnded(RoundEndReason::Manual))
            .unwrap_err();
        assert_eq!(err.from, SessionPhase::RoundSummary);
    }

    #[test]
    fn invalid_transition_leaves_version_untouched() {
        let mut sm = SessionStateMachine::new();
        let err = sm.apply(SessionEvent::NextRound).unwrap_err();
        assert_eq!(err.from, SessionPhase::NotStarted);
        assert_eq!(err.event, SessionEvent::NextRound);
        assert_eq!(sm.snapshot().version, 0);
    }

    #[test]
    fn reset_is_accepted_from_every_phase() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::NotStarted);
        apply(&mut sm, SessionEvent::Start);
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::NotStarted);
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::RoundEnded(RoundEndReason::Manual));
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::NotStarted);
    }
}
