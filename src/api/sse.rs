//! Server-Sent Events for a running turn
//!
//! One `patch` event per UI patch, then exactly one closing `done` or
//! `error` event.

use super::types::TurnDoneResponse;
use crate::multiplexer::UiOutputSequence;
use crate::ui::UiPatch;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_stream::StreamExt;

/// How a turn ended, as reported to the stream
#[derive(Debug)]
pub enum TurnEnd {
    Done(TurnDoneResponse),
    Failed { message: String },
}

/// UI patches followed by the turn's closing event
pub fn turn_stream(
    ui: UiOutputSequence,
    end: oneshot::Receiver<TurnEnd>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // A broken sequence is reported once, by the closing event
    let patches = ui.filter_map(|item| item.ok().map(|patch| Ok(patch_event(&patch))));

    let closing = futures::stream::once(async move {
        let end = end.await.unwrap_or_else(|_| TurnEnd::Failed {
            message: "turn ended without a result".to_string(),
        });
        Ok(end_event(end))
    });

    Sse::new(patches.chain(closing)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn patch_event(patch: &UiPatch) -> Event {
    let data = serde_json::to_string(patch).unwrap_or_else(|e| {
        json!({"op": "invalid", "error": e.to_string()}).to_string()
    });
    Event::default().event("patch").data(data)
}

fn end_event(end: TurnEnd) -> Event {
    let (event_type, data) = match end {
        TurnEnd::Done(done) => (
            "done",
            serde_json::to_value(done).unwrap_or_default(),
        ),
        TurnEnd::Failed { message } => ("error", json!({ "message": message })),
    };
    Event::default().event(event_type).data(data.to_string())
}
