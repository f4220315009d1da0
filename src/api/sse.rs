//! Server-Sent Events support

use crate::runtime::{GameSnapshot, SseEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert a snapshot and the broadcast feed into an SSE stream
pub fn sse_stream(
    snapshot: GameSnapshot,
    broadcast_rx: broadcast::Receiver<SseEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok(sse_event_to_axum(SseEvent::Init { snapshot }))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).map(|result| match result {
        Ok(event) => Ok(sse_event_to_axum(event)),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            // The client refetches the snapshot rather than render a gap
            tracing::warn!(skipped, "SSE subscriber lagged");
            Ok(to_axum("resync", &json!({ "type": "resync", "skipped": skipped })))
        }
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn sse_event_to_axum(event: SseEvent) -> Event {
    let (event_type, data) = payload(event);
    to_axum(event_type, &data)
}

fn to_axum(event_type: &'static str, data: &Value) -> Event {
    Event::default().event(event_type).data(data.to_string())
}

fn payload(event: SseEvent) -> (&'static str, Value) {
    match event {
        SseEvent::Init { snapshot } => (
            "init",
            json!({
                "type": "init",
                "game": snapshot
            }),
        ),
        SseEvent::TurnAppended { index, turn } => (
            "turn_appended",
            json!({
                "type": "turn_appended",
                "index": index,
                "turn": turn
            }),
        ),
        SseEvent::TurnUpdated { index, text } => (
            "turn_updated",
            json!({
                "type": "turn_updated",
                "index": index,
                "text": text
            }),
        ),
        SseEvent::StateChange { state, busy } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state,
                "busy": busy
            }),
        ),
        SseEvent::Error { banner } => (
            "error",
            json!({
                "type": "error",
                "error": banner
            }),
        ),
        SseEvent::ErrorCleared => (
            "error_cleared",
            json!({
                "type": "error_cleared"
            }),
        ),
    }
}
