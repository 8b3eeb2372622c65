//! Best-effort replication of round scores to the configured game store.
//!
//! Pushes are debounced per `(device, round)` key and only the latest payload
//! is written. Round boundaries use [`RoundSync::flush`], which skips the
//! debounce and waits for the write under a bounded timeout.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::{task::JoinHandle, time::timeout};
use tracing::{debug, warn};

use crate::{
    config::SyncSettings,
    dao::{game_store::UpdateOutcome, models::GameRecordEntity},
    state::{StoreSlot, game::RoundScore},
};

type RoundKey = (String, u32);

/// Result of a flush or re-initialisation; never surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The payload reached the store.
    Written,
    /// The store already holds this payload from a previous write.
    Unchanged,
    /// The store rejected the write or has no record for the device.
    Failed,
    /// The write did not complete within the flush timeout.
    TimedOut,
    /// No store is installed.
    Degraded,
}

struct PendingPush {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Debounced writer of round scores keyed by `(device, round)`.
pub struct RoundSync {
    store: StoreSlot,
    settings: SyncSettings,
    pending: DashMap<RoundKey, PendingPush>,
    written: DashMap<RoundKey, RoundScore>,
    next_generation: AtomicU64,
}

impl RoundSync {
    /// Adapter writing through whatever store `store` holds at write time.
    pub fn new(store: StoreSlot, settings: SyncSettings) -> Arc<Self> {
        Arc::new(Self {
            store,
            settings,
            pending: DashMap::new(),
            written: DashMap::new(),
            next_generation: AtomicU64::new(0),
        })
    }

    /// Schedule `scores` for `round` of `device_id`, replacing any pending payload.
    pub fn push(self: &Arc<Self>, device_id: &str, round: u32, scores: RoundScore) {
        let key: RoundKey = (device_id.to_owned(), round);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let debounce = self.settings.debounce;

        // The entry guard is held while spawning so the task cannot look up its
        // own entry before it exists.
        let entry = self.pending.entry(key.clone());
        let sync = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let outcome = sync.write(&key, scores).await;
            debug!(
                device_id = %key.0,
                round = key.1,
                outcome = ?outcome,
                "debounced round push finished"
            );
            sync.pending
                .remove_if(&key, |_, pending| pending.generation == generation);
        });

        let push = PendingPush { generation, handle };
        match entry {
            Entry::Occupied(mut occupied) => occupied.insert(push).handle.abort(),
            Entry::Vacant(vacant) => {
                vacant.insert(push);
            }
        }
    }

    /// Cancel any pending push for the key and write `scores` now, bounded by the flush timeout.
    pub async fn flush(&self, device_id: &str, round: u32, scores: RoundScore) -> FlushOutcome {
        let key: RoundKey = (device_id.to_owned(), round);
        if let Some((_, pending)) = self.pending.remove(&key) {
            pending.handle.abort();
        }

        match timeout(self.settings.flush_timeout, self.write(&key, scores)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    device_id,
                    round,
                    timeout_ms = self.settings.flush_timeout.as_millis() as u64,
                    "round flush timed out"
                );
                FlushOutcome::TimedOut
            }
        }
    }

    /// Abort every pending push of `device_id` and forget what was written for it.
    pub fn cancel_device(&self, device_id: &str) {
        self.pending.retain(|(device, _), pending| {
            if device == device_id {
                pending.handle.abort();
                false
            } else {
                true
            }
        });
        self.written.retain(|(device, _), _| device != device_id);
    }

    /// Forget the last written payload of one round, so the next write always reaches the store.
    pub fn forget_round(&self, device_id: &str, round: u32) {
        self.written.remove(&(device_id.to_owned(), round));
    }

    /// Replace the remote record of `device_id` with a fresh one, bounded by the flush timeout.
    pub async fn reinitialize(&self, device_id: &str, team1: &str, team2: &str) -> FlushOutcome {
        let Some(store) = self.store.get().await else {
            return FlushOutcome::Degraded;
        };

        let save = store.save_game(device_id.to_owned(), GameRecordEntity::fresh(team1, team2));
        match timeout(self.settings.flush_timeout, save).await {
            Ok(Ok(())) => FlushOutcome::Written,
            Ok(Err(err)) => {
                warn!(device_id, error = %err, "failed to re-initialise game record");
                FlushOutcome::Failed
            }
            Err(_) => {
                warn!(device_id, "re-initialising game record timed out");
                FlushOutcome::TimedOut
            }
        }
    }

    /// Number of pushes still waiting for their debounce window.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of rounds whose last written payload is remembered.
    pub fn tracked_rounds(&self) -> usize {
        self.written.len()
    }

    async fn write(&self, key: &RoundKey, scores: RoundScore) -> FlushOutcome {
        let (device_id, round) = (key.0.as_str(), key.1);
        if self.written.get(key).is_some_and(|last| *last == scores) {
            return FlushOutcome::Unchanged;
        }

        let Some(store) = self.store.get().await else {
            warn!(device_id, round, "no storage installed; round score not written");
            return FlushOutcome::Degraded;
        };

        match store
            .update_round(device_id.to_owned(), round, scores.into())
            .await
        {
            Ok(UpdateOutcome::Updated) => {
                self.written.insert(key.clone(), scores);
                FlushOutcome::Written
            }
            Ok(UpdateOutcome::NotFound) => {
                warn!(device_id, round, "no stored game for device; round score dropped");
                FlushOutcome::Failed
            }
            Err(err) => {
                warn!(device_id, round, error = %err, "failed to write round score");
                FlushOutcome::Failed
            }
        }
    }
}
