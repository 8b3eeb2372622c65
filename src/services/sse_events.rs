use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{session::SessionView, sse::ServerEvent},
    state::{SseHub, session::SessionSnapshot},
};

/// Event name carrying a full [`SessionView`].
pub const EVENT_SESSION_SNAPSHOT: &str = "session.snapshot";

/// Broadcast the latest view of a session to its subscribers.
pub fn broadcast_session_snapshot(hub: &SseHub, snapshot: SessionSnapshot) {
    if hub.subscriber_count() == 0 {
        return;
    }
    send_event(hub, EVENT_SESSION_SNAPSHOT, &SessionView::from(snapshot));
}

fn send_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
