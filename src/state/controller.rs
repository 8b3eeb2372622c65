//! Async owner of a [`GameSession`]: serialises every action behind one lock,
//! drives the round ticker and publishes snapshots.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{
    sync::{Mutex, MutexGuard, broadcast},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, info};

use crate::{
    dto::sse::ServerEvent,
    services::{sse_events::broadcast_session_snapshot, sync_service::RoundSync},
    state::{
        SseHub,
        game::PersonCatalog,
        session::{
            ClosedRound, GameSession, GuessOutcome, GuessRejection, NextRoundOutcome, SessionError,
            SessionSnapshot, TickResult,
        },
        state_machine::{RoundEndReason, SessionPhase},
    },
};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 16;

struct Dispatch {
    session: GameSession,
    ticker: Option<JoinHandle<()>>,
    closed: bool,
    last_activity: Instant,
}

impl Dispatch {
    fn abort_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.abort_ticker();
    }
}

/// Single dispatch point of one device's session.
pub struct SessionController {
    device_id: String,
    dispatch: Mutex<Dispatch>,
    sync: Arc<RoundSync>,
    events: SseHub,
}

impl SessionController {
    /// Wrap `session`; nothing runs until the first action.
    pub fn new(session: GameSession, sync: Arc<RoundSync>) -> Arc<Self> {
        Arc::new(Self {
            device_id: session.device_id().to_owned(),
            dispatch: Mutex::new(Dispatch {
                session,
                ticker: None,
                closed: false,
                last_activity: Instant::now(),
            }),
            sync,
            events: SseHub::new(EVENT_CAPACITY),
        })
    }

    /// Device owning the session.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Current snapshot; counts as activity.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut dispatch = self.dispatch.lock().await;
        dispatch.last_activity = Instant::now();
        dispatch.session.snapshot()
    }

    /// Subscribe to `session.snapshot` events of this session.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Re-send the current snapshot to every subscriber.
    pub async fn publish(&self) {
        let dispatch = self.dispatch.lock().await;
        broadcast_session_snapshot(&self.events, dispatch.session.snapshot());
    }

    /// Attach the catalog if the session does not have one yet.
    pub async fn attach_catalog(&self, catalog: Arc<PersonCatalog>) {
        let mut dispatch = self.dispatch.lock().await;
        if !dispatch.session.has_catalog() {
            dispatch.session.attach_catalog(catalog);
        }
    }

    /// Whether a catalog is attached.
    pub async fn has_catalog(&self) -> bool {
        self.dispatch.lock().await.session.has_catalog()
    }

    /// Start round 1 and arm its ticker.
    pub async fn start(self: &Arc<Self>) -> Result<SessionSnapshot, SessionError> {
        let mut dispatch = self.lock_open().await?;
        let generation = dispatch.session.start()?;
        self.arm_ticker(&mut dispatch, generation);
        info!(device_id = %self.device_id, "session started");
        Ok(self.publish_locked(&dispatch))
    }

    /// Credit the turn team; accepted guesses are pushed to storage in the background.
    pub async fn correct_guess(&self) -> (GuessOutcome, SessionSnapshot) {
        let mut dispatch = self.dispatch.lock().await;
        if dispatch.closed {
            debug!(device_id = %self.device_id, "guess on a closed session ignored");
            return (
                GuessOutcome::Rejected(GuessRejection::SessionClosed),
                dispatch.session.snapshot(),
            );
        }
        dispatch.last_activity = Instant::now();
        let outcome = dispatch.session.correct_guess();
        match outcome {
            GuessOutcome::Accepted { round, score } => {
                self.sync.push(&self.device_id, round, score);
                (outcome, self.publish_locked(&dispatch))
            }
            GuessOutcome::Rejected(reason) => {
                debug!(device_id = %self.device_id, reason = ?reason, "guess rejected");
                (outcome, dispatch.session.snapshot())
            }
        }
    }

    /// Close the active round before its timer runs out.
    pub async fn end_round(&self) -> Result<SessionSnapshot, SessionError> {
        let mut dispatch = self.lock_open().await?;
        let closed = dispatch.session.end_round(RoundEndReason::Manual)?;
        dispatch.abort_ticker();
        self.flush_closed(closed).await;
        Ok(self.publish_locked(&dispatch))
    }

    /// Leave the summary: start the next round or finish the game.
    pub async fn next_round(self: &Arc<Self>) -> Result<SessionSnapshot, SessionError> {
        let mut dispatch = self.lock_open().await?;
        let previous = dispatch.session.current_round();
        match dispatch.session.next_round()? {
            NextRoundOutcome::Started {
                round,
                team,
                timer_generation,
            } => {
                self.sync.forget_round(&self.device_id, previous);
                self.arm_ticker(&mut dispatch, timer_generation);
                info!(device_id = %self.device_id, round, team = team.number(), "round started");
            }
            NextRoundOutcome::Finished(reason) => {
                self.sync.forget_round(&self.device_id, previous);
                let totals = dispatch.session.totals();
                info!(
                    device_id = %self.device_id,
                    reason = ?reason,
                    team1 = totals.team1,
                    team2 = totals.team2,
                    "game over"
                );
            }
        }
        Ok(self.publish_locked(&dispatch))
    }

    /// Back to round-one defaults; pending work of the device is cancelled and the
    /// remote record re-initialised.
    pub async fn reset(&self) -> Result<SessionSnapshot, SessionError> {
        let mut dispatch = self.lock_open().await?;
        dispatch.abort_ticker();
        self.sync.cancel_device(&self.device_id);
        dispatch.session.reset();

        let teams = dispatch.session.teams().clone();
        let outcome = self
            .sync
            .reinitialize(&self.device_id, &teams.team1, &teams.team2)
            .await;
        info!(device_id = %self.device_id, outcome = ?outcome, "session reset");
        Ok(self.publish_locked(&dispatch))
    }

    /// Close the session for good: the ticker stops, pending pushes are dropped
    /// and every later action is refused. Used when the session is replaced.
    pub async fn shutdown(&self) {
        let mut dispatch = self.dispatch.lock().await;
        dispatch.close();
        self.sync.cancel_device(&self.device_id);
    }

    /// Close the session if nobody used or watched it for `idle`.
    ///
    /// Returns `true` when the session is closed and can be dropped. A session
    /// with a running round or with subscribers is kept.
    pub fn close_if_idle(&self, idle: Duration) -> bool {
        let Ok(mut dispatch) = self.dispatch.try_lock() else {
            return false;
        };
        if dispatch.closed {
            return true;
        }
        if dispatch.session.phase() == SessionPhase::InProgress
            || self.events.subscriber_count() > 0
            || dispatch.last_activity.elapsed() < idle
        {
            return false;
        }

        dispatch.close();
        self.sync.cancel_device(&self.device_id);
        true
    }

    async fn lock_open(&self) -> Result<MutexGuard<'_, Dispatch>, SessionError> {
        let mut dispatch = self.dispatch.lock().await;
        if dispatch.closed {
            return Err(SessionError::Closed);
        }
        dispatch.last_activity = Instant::now();
        Ok(dispatch)
    }

    async fn on_tick(&self, generation: u64) -> TickResult {
        let mut dispatch = self.dispatch.lock().await;
        if dispatch.closed {
            return TickResult::Stale;
        }
        let result = dispatch.session.tick(generation);
        match result {
            TickResult::Ticked(_) => {
                self.publish_locked(&dispatch);
            }
            TickResult::Expired(closed) => {
                // Called from the ticker itself: detach instead of aborting.
                dispatch.ticker.take();
                self.flush_closed(closed).await;
                self.publish_locked(&dispatch);
            }
            TickResult::Ignored | TickResult::Stale => {}
        }
        result
    }

    fn arm_ticker(self: &Arc<Self>, dispatch: &mut Dispatch, generation: u64) {
        dispatch.abort_ticker();
        let controller: Weak<Self> = Arc::downgrade(self);
        dispatch.ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                if !matches!(controller.on_tick(generation).await, TickResult::Ticked(_)) {
                    break;
                }
            }
        }));
    }

    async fn flush_closed(&self, closed: ClosedRound) {
        let outcome = self
            .sync
            .flush(&self.device_id, closed.round, closed.score)
            .await;
        info!(
            device_id = %self.device_id,
            round = closed.round,
            reason = ?closed.reason,
            team1_score = closed.score.team1_score,
            team2_score = closed.score.team2_score,
            outcome = ?outcome,
            "round closed"
        );
    }

    fn publish_locked(&self, dispatch: &Dispatch) -> SessionSnapshot {
        let snapshot = dispatch.session.snapshot();
        broadcast_session_snapshot(&self.events, snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        config::{GameRules, SyncSettings},
        dao::{
            game_store::{GameStore, UpdateOutcome, memory::MemoryGameStore},
            models::{GameRecordEntity, RoundScoreEntity},
            storage::StorageResult,
        },
        state::{
            StoreSlot,
            game::{Person, TeamNames},
            state_machine::SessionPhase,
        },
    };

    const DEVICE: &str = "tablet-1";

    fn catalog(size: u32) -> Arc<PersonCatalog> {
        Arc::new(PersonCatalog::new((1..=size).map(|id| Person {
            id,
            name: format!("Person {id}"),
            description: String::new(),
            image: String::new(),
        })))
    }

    async fn controller(size: u32) -> (Arc<SessionController>, MemoryGameStore) {
        let store = MemoryGameStore::new();
        store
            .save_game(DEVICE.into(), GameRecordEntity::fresh("Reds", "Blues"))
            .await
            .unwrap();
        let slot = StoreSlot::default();
        slot.install(Arc::new(store.clone())).await;
        let sync = RoundSync::new(slot, SyncSettings::default());

        let mut session = GameSession::new(
            DEVICE.into(),
            TeamNames::new("Reds", "Blues"),
            GameRules::default(),
            StdRng::seed_from_u64(7),
        );
        session.attach_catalog(catalog(size));
        (SessionController::new(session, sync), store)
    }

    async fn stored_round(store: &MemoryGameStore, round: u32) -> Option<RoundScoreEntity> {
        let record = store.find_game(DEVICE.into()).await.unwrap()?;
        record.round.get(&round).copied()
    }

    type RoundUpdate = (String, u32, RoundScoreEntity);

    /// Store that only records round updates.
    #[derive(Default)]
    struct CountingStore {
        updates: std::sync::Mutex<Vec<RoundUpdate>>,
    }

    impl CountingStore {
        fn updates(&self) -> Vec<RoundUpdate> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl GameStore for Arc<CountingStore> {
        fn save_game(
            &self,
            _device_id: String,
            _record: GameRecordEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn find_game(
            &self,
            _device_id: String,
        ) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>> {
            Box::pin(async { Ok(None) })
        }

        fn update_round(
            &self,
            device_id: String,
            round: u32,
            scores: RoundScoreEntity,
        ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
            let store = self.clone();
            Box::pin(async move {
                store.updates.lock().unwrap().push((device_id, round, scores));
                Ok(UpdateOutcome::Updated)
            })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    async fn counting_controller() -> (Arc<SessionController>, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        let slot = StoreSlot::default();
        slot.install(Arc::new(store.clone())).await;
        let sync = RoundSync::new(slot, SyncSettings::default());

        let mut session = GameSession::new(
            DEVICE.into(),
            TeamNames::new("Reds", "Blues"),
            GameRules::default(),
            StdRng::seed_from_u64(7),
        );
        session.attach_catalog(catalog(25));
        (SessionController::new(session, sync), store)
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_counts_down_and_closes_round() {
        let (controller, store) = controller(25).await;
        controller.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(controller.snapshot().await.time_left, 59);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::RoundSummary);
        assert_eq!(snapshot.time_left, 0);
        assert!(snapshot.is_drawer_open);
        assert_eq!(stored_round(&store, 1).await, Some(RoundScoreEntity::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn guesses_are_pushed_after_debounce() {
        let (controller, store) = controller(25).await;
        controller.start().await.unwrap();

        let (first, _) = controller.correct_guess().await;
        let (second, snapshot) = controller.correct_guess().await;
        assert!(matches!(first, GuessOutcome::Accepted { .. }));
        assert!(matches!(second, GuessOutcome::Accepted { .. }));
        assert_eq!(snapshot.totals.team1, 2);
        assert_eq!(snapshot.remaining_person_ids.len(), 23);

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(
            stored_round(&store, 1).await,
            Some(RoundScoreEntity {
                team1_score: 2,
                team2_score: 0,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn manual_end_round_stops_the_ticker() {
        let (controller, store) = controller(25).await;
        controller.start().await.unwrap();
        controller.correct_guess().await;

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let snapshot = controller.end_round().await.unwrap();
        assert_eq!(snapshot.phase, SessionPhase::RoundSummary);
        assert_eq!(snapshot.time_left, 50);
        assert_eq!(
            stored_round(&store, 1).await,
            Some(RoundScoreEntity {
                team1_score: 1,
                team2_score: 0,
            })
        );

        tokio::time::sleep(Duration::from_secs(120)).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::RoundSummary);
        assert_eq!(snapshot.time_left, 50);

        let snapshot = controller.next_round().await.unwrap();
        assert_eq!(snapshot.current_round, 2);
        assert_eq!(snapshot.team_turn.number(), 2);
        assert_eq!(snapshot.time_left, 60);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(controller.snapshot().await.time_left, 59);
    }

    #[tokio::test(start_paused = true)]
    async fn quick_round_change_leaves_a_single_ticker() {
        let (controller, _store) = controller(25).await;
        controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
        controller.end_round().await.unwrap();
        controller.next_round().await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(controller.snapshot().await.time_left, 59);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(controller.snapshot().await.time_left, 58);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_timer_and_pending_pushes() {
        let (controller, store) = controller(25).await;
        controller.start().await.unwrap();
        controller.correct_guess().await;

        let snapshot = controller.reset().await.unwrap();
        assert_eq!(snapshot.phase, SessionPhase::NotStarted);
        assert_eq!(snapshot.current_round, 1);
        assert_eq!(snapshot.time_left, 60);
        assert_eq!(snapshot.totals.team1, 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.snapshot().await.time_left, 60);
        assert_eq!(stored_round(&store, 1).await, Some(RoundScoreEntity::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_pool_finishes_game() {
        let (controller, _store) = controller(2).await;
        controller.start().await.unwrap();
        controller.correct_guess().await;
        controller.correct_guess().await;
        let (rejected, _) = controller.correct_guess().await;
        assert!(matches!(rejected, GuessOutcome::Rejected(_)));

        controller.end_round().await.unwrap();
        let snapshot = controller.next_round().await.unwrap();
        assert!(snapshot.is_game_over);
        assert_eq!(snapshot.current_round, 1);
        assert!(controller.end_round().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_receive_snapshots() {
        let (controller, _store) = controller(25).await;
        let mut events = controller.subscribe();
        controller.start().await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("session.snapshot"));
        let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(payload["phase"], "inProgress");
        assert_eq!(payload["deviceId"], DEVICE);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_round_without_guesses_is_written_once() {
        let (controller, store) = counting_controller().await;
        controller.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(controller.snapshot().await.phase, SessionPhase::RoundSummary);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(
            store.updates(),
            vec![(DEVICE.to_owned(), 1, RoundScoreEntity::default())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shut_down_session_refuses_actions() {
        let (controller, store) = controller(25).await;
        controller.start().await.unwrap();
        controller.correct_guess().await;
        controller.shutdown().await;
        assert_eq!(controller.sync.pending_count(), 0);

        let (outcome, snapshot) = controller.correct_guess().await;
        assert_eq!(outcome, GuessOutcome::Rejected(GuessRejection::SessionClosed));
        assert_eq!(snapshot.totals.team1, 1);
        assert_eq!(controller.sync.pending_count(), 0);
        assert_eq!(controller.end_round().await.unwrap_err(), SessionError::Closed);
        assert_eq!(controller.next_round().await.unwrap_err(), SessionError::Closed);
        assert_eq!(controller.reset().await.unwrap_err(), SessionError::Closed);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.snapshot().await.time_left, 60);
        assert_eq!(stored_round(&store, 1).await, Some(RoundScoreEntity::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_is_closed() {
        let idle = Duration::from_secs(600);
        let (controller, _store) = controller(25).await;
        assert!(!controller.close_if_idle(idle));

        tokio::time::sleep(Duration::from_secs(601)).await;
        assert!(controller.close_if_idle(idle));
        assert_eq!(controller.start().await.unwrap_err(), SessionError::Closed);
        assert!(controller.close_if_idle(idle));
    }

    #[tokio::test(start_paused = true)]
    async fn watched_or_running_session_is_kept() {
        let idle = Duration::from_secs(10);
        let (watched, _store) = controller(25).await;
        let events = watched.subscribe();
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(!watched.close_if_idle(idle));
        drop(events);
        assert!(watched.close_if_idle(idle));

        let (running, _store) = controller(25).await;
        running.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(!running.close_if_idle(idle));
        assert_eq!(running.snapshot().await.time_left, 49);
    }

    #[tokio::test(start_paused = true)]
    async fn next_round_forgets_the_written_round() {
        let (controller, _store) = controller(25).await;
        controller.start().await.unwrap();
        controller.correct_guess().await;
        controller.end_round().await.unwrap();
        assert_eq!(controller.sync.tracked_rounds(), 1);

        controller.next_round().await.unwrap();
        assert_eq!(controller.sync.tracked_rounds(), 0);

        controller.correct_guess().await;
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(controller.sync.tracked_rounds(), 1);
        controller.end_round().await.unwrap();
        controller.next_round().await.unwrap();
        assert_eq!(controller.sync.tracked_rounds(), 0);
    }
}
