/// Lifecycle of the countdown for the active round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// Reset for a new round but not ticking yet.
    Armed,
    /// Counting down once per second.
    Running,
    /// Frozen while the round summary is displayed.
    Paused,
    /// Reached zero; only a reset re-arms it.
    Expired,
}

/// Result of feeding one tick to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second elapsed, time remains.
    Ticked(u32),
    /// The countdown just hit zero. Reported once per reset.
    Expired,
    /// The timer is not running; nothing changed.
    Ignored,
}

/// Countdown clock for a single round.
///
/// The timer is a plain value: the session controller feeds it ticks from a
/// real-time ticker tagged with [`RoundTimer::generation`], so ticks from a
/// superseded round can be told apart and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTimer {
    duration: u32,
    time_left: u32,
    status: TimerStatus,
    generation: u64,
}

impl RoundTimer {
    /// Armed timer of `duration` seconds at generation 0.
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            time_left: duration,
            status: TimerStatus::Armed,
            generation: 0,
        }
    }

    /// Reinitialise the countdown for the next round and invalidate older tickers.
    pub fn reset(&mut self, duration: u32) -> u64 {
        self.duration = duration;
        self.time_left = duration;
        self.status = TimerStatus::Armed;
        self.generation += 1;
        self.generation
    }

    /// Begin (or resume) counting down. Has no effect once expired.
    pub fn start(&mut self) -> bool {
        match self.status {
            TimerStatus::Armed | TimerStatus::Paused => {
                if self.time_left == 0 {
                    self.status = TimerStatus::Expired;
                    return false;
                }
                self.status = TimerStatus::Running;
                true
            }
            TimerStatus::Running => true,
            TimerStatus::Expired => false,
        }
    }

    /// Stop ticking without touching the remaining time.
    pub fn pause(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
        }
    }

    /// Force the countdown to zero, e.g. when a round is rebuilt from storage.
    pub fn expire(&mut self) {
        self.time_left = 0;
        self.status = TimerStatus::Expired;
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != TimerStatus::Running {
            return TickOutcome::Ignored;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.status = TimerStatus::Expired;
            TickOutcome::Expired
        } else {
            TickOutcome::Ticked(self.time_left)
        }
    }

    /// Seconds left in the round.
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    /// Length of the round the timer was last reset for.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Current lifecycle state.
    pub fn status(&self) -> TimerStatus {
        self.status
    }

    /// Tag of the current round; bumped by every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether ticks currently decrement the countdown.
    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armed_timer_does_not_tick() {
        let mut timer = RoundTimer::new(3);
        assert_eq!(timer.tick(), TickOutcome::Ignored);
        assert_eq!(timer.time_left(), 3);
    }

    #[test]
    fn counts_down_and_expires_exactly_once() {
        let mut timer = RoundTimer::new(3);
        timer.start();

        assert_eq!(timer.tick(), TickOutcome::Ticked(2));
        assert_eq!(timer.tick(), TickOutcome::Ticked(1));
        assert_eq!(timer.tick(), TickOutcome::Expired);
        assert_eq!(timer.time_left(), 0);

        for _ in 0..5 {
            assert_eq!(timer.tick(), TickOutcome::Ignored);
        }
        assert_eq!(timer.status(), TimerStatus::Expired);
        assert!(!timer.start(), "expired timer must be reset before it runs again");
    }

    #[test]
    fn paused_timer_keeps_remaining_time() {
        let mut timer = RoundTimer::new(10);
        timer.start();
        timer.tick();
        timer.pause();
        assert_eq!(timer.tick(), TickOutcome::Ignored);
        assert_eq!(timer.time_left(), 9);
        timer.start();
        assert_eq!(timer.tick(), TickOutcome::Ticked(8));
    }

    #[test]
    fn reset_bumps_generation_and_rearms() {
        let mut timer = RoundTimer::new(1);
        let first = timer.generation();
        timer.start();
        assert_eq!(timer.tick(), TickOutcome::Expired);

        let next = timer.reset(60);
        assert!(next > first);
        assert_eq!(timer.status(), TimerStatus::Armed);
        assert_eq!(timer.time_left(), 60);
        assert!(timer.start());
        assert_eq!(timer.tick(), TickOutcome::Ticked(59));
    }

    #[test]
    fn zero_duration_never_runs() {
        let mut timer = RoundTimer::new(0);
        assert!(!timer.start());
        assert_eq!(timer.tick(), TickOutcome::Ignored);
    }
}
