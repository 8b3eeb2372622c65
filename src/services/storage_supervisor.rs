use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Exponential backoff doubling from [`INITIAL_DELAY`] up to [`MAX_DELAY`].
#[derive(Debug, Clone, Copy)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            current: INITIAL_DELAY,
        }
    }

    /// Return the delay to wait now and double the next one.
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_DELAY);
        delay
    }

    fn reset(&mut self) {
        self.current = INITIAL_DELAY;
    }
}

/// Connect to the storage backend and keep the shared state in degraded mode
/// whenever it is unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut backoff = Backoff::new();

    loop {
        match connect().await {
            Ok(store) => {
                state.set_game_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                backoff.reset();

                watch_health(&state, store.as_ref()).await;

                state.clear_game_store().await;
                sleep(backoff.next_delay()).await;
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(backoff.next_delay()).await;
            }
        }
    }
}

/// Poll the installed store until reconnection attempts are exhausted.
async fn watch_health(state: &SharedState, store: &dyn GameStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded() {
                info!("storage healthy again; leaving degraded mode");
                state.update_degraded(false);
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        if !reconnect(state, store).await {
            warn!("exhausted storage reconnect attempts; staying in degraded mode");
            return;
        }
        state.update_degraded(false);
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect(state: &SharedState, store: &dyn GameStore) -> bool {
    let mut backoff = Backoff::new();
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(backoff.next_delay()).await;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::{UpdateOutcome, memory::MemoryGameStore},
            models::{GameRecordEntity, RoundScoreEntity},
            storage::StorageResult,
        },
        state::AppState,
    };

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = Backoff::new();
        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay()).collect();
        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[1], Duration::from_secs(2));
        assert_eq!(delays[3], Duration::from_secs(8));
        assert_eq!(delays[4], MAX_DELAY);
        assert_eq!(delays[5], MAX_DELAY);
        backoff.reset();
        assert_eq!(backoff.next_delay(), INITIAL_DELAY);
    }

    /// Store whose health check always fails and whose reconnects never succeed.
    struct BrokenStore;

    fn down<T: Send + 'static>() -> BoxFuture<'static, StorageResult<T>> {
        Box::pin(async {
            Err(StorageError::unavailable(
                "down".into(),
                std::io::Error::other("down"),
            ))
        })
    }

    impl GameStore for BrokenStore {
        fn save_game(
            &self,
            _device_id: String,
            _record: GameRecordEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            down()
        }

        fn find_game(
            &self,
            _device_id: String,
        ) -> BoxFuture<'static, StorageResult<Option<GameRecordEntity>>> {
            down()
        }

        fn update_round(
            &self,
            _device_id: String,
            _round: u32,
            _scores: RoundScoreEntity,
        ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
            down()
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            down()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            down()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_store_leaves_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());

        let supervised = state.clone();
        let task = tokio::spawn(run(supervised, || async {
            Ok::<_, StorageError>(Arc::new(MemoryGameStore::new()) as Arc<dyn GameStore>)
        }));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!state.is_degraded());
        assert!(state.require_game_store().await.is_ok());
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_connects_are_retried() {
        let state = AppState::new(AppConfig::default());
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let task = tokio::spawn(run(state.clone(), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<Arc<dyn GameStore>, _>(StorageError::unavailable(
                    "refused".into(),
                    std::io::Error::other("refused"),
                ))
            }
        }));
        // 1s + 2s of backoff elapse before the third attempt.
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(state.is_degraded());
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn lost_store_enters_degraded_mode_and_is_dropped() {
        let state = AppState::new(AppConfig::default());
        let task = tokio::spawn(run(state.clone(), || async {
            Ok::<_, StorageError>(Arc::new(BrokenStore) as Arc<dyn GameStore>)
        }));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(state.is_degraded());

        // Three reconnect attempts back off for 1s + 2s + 4s.
        tokio::time::sleep(Duration::from_millis(7_100)).await;
        assert!(state.require_game_store().await.is_err());
        task.abort();
    }
}
