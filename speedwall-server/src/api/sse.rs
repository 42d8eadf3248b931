//! SSE endpoints for wall and telemetry viewers
//!
//! Each connection gets its own session task (see [`crate::viewer`]); the
//! handlers here only adapt the session's outbound channel into an SSE
//! stream. Dropping the stream closes the channel, which ends the task.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::state::AppState;
use crate::viewer::{spawn_telemetry_session, spawn_wall_session};

/// GET /api/events/wall - Rotation frames for one public wall display
pub async fn wall_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = spawn_wall_session(state);
    let stream = ReceiverStream::new(rx).filter_map(|frame| async move {
        match Event::default().event("WallUpdate").json_data(&frame) {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                warn!("wall frame serialization failed: {err}");
                None
            }
        }
    });
    sse_response(stream)
}

/// GET /api/events/telemetry - Throttled radar plot stream for one admin
pub async fn telemetry_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = spawn_telemetry_session(state);
    let stream = ReceiverStream::new(rx).filter_map(|event| async move {
        let name = event.event_type();
        match Event::default().event(name).json_data(&event) {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                warn!("telemetry event serialization failed: {err}");
                None
            }
        }
    });
    sse_response(stream)
}

fn sse_response<S>(stream: S) -> Sse<S>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
