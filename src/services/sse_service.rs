use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::sse::ServerEvent, error::ServiceError, services::session_service, state::SharedState,
};

/// Subscribe to the snapshot stream of a device's session and queue an
/// initial snapshot for the new subscriber.
pub async fn subscribe_session(
    state: &SharedState,
    device_id: &str,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    let controller = session_service::controller(state, device_id).await?;
    let receiver = controller.subscribe();
    controller.publish().await;
    Ok(receiver)
}

/// Convert a broadcast receiver into an SSE response, forwarding events until
/// the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    device_id: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged snapshots but keep the stream alive.
                            debug!(%device_id, skipped, "session SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(%device_id, "session SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::memory::MemoryGameStore,
        services::sse_events::EVENT_SESSION_SNAPSHOT,
        state::{AppState, game::TeamNames},
    };

    #[tokio::test]
    async fn new_subscriber_receives_current_snapshot() {
        let state = AppState::new(AppConfig::default());
        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        session_service::install_session(&state, "tablet".into(), TeamNames::new("A", "B")).await;

        let mut receiver = subscribe_session(&state, "tablet").await.unwrap();
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_SESSION_SNAPSHOT));
        let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(payload["deviceId"], "tablet");
        assert_eq!(payload["phase"], "notStarted");
    }

    #[tokio::test]
    async fn unknown_session_cannot_be_streamed() {
        let state = AppState::new(AppConfig::default());
        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        let err = subscribe_session(&state, "ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
