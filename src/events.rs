//! Events emitted while a turn runs
//!
//! The running state machine produces one ordered sequence of
//! [`StreamEvent`]s. Token deltas and UI fragments are the only variants the
//! multiplexer renders; everything else is trace information.

use crate::multiplexer::StreamFault;
use crate::state_machine::{AgentState, Node};
use crate::ui::Fragment;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tokio::sync::mpsc;

/// Opaque key distinguishing one reasoning invocation's text stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a UI fragment event affects the output sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentMode {
    /// Add a new top-level entry
    Append,
    /// Replace the most recently appended top-level entry
    Update,
}

/// Diagnostic events; carried for final-result resolution only
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "trace", rename_all = "snake_case")]
pub enum TraceEvent {
    TurnStarted { input: String },
    NodeStarted { node: Node },
    NodeFinished { node: Node, update: Value },
    TurnFinished { state: AgentState },
}

/// One item of the event sequence produced by a running turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    TokenDelta { run_id: RunId, text: String },
    UiFragment { mode: FragmentMode, fragment: Fragment },
    Trace(TraceEvent),
}

impl StreamEvent {
    /// Structured output carried by this event
    pub fn payload(&self) -> Value {
        match self {
            StreamEvent::TokenDelta { run_id, text } => json!({
                "run_id": run_id,
                "text": text,
            }),
            StreamEvent::UiFragment { fragment, .. } => {
                serde_json::to_value(fragment).unwrap_or(Value::Null)
            }
            StreamEvent::Trace(TraceEvent::TurnStarted { input }) => json!({ "input": input }),
            StreamEvent::Trace(TraceEvent::NodeStarted { node }) => json!({ "node": node }),
            StreamEvent::Trace(TraceEvent::NodeFinished { update, .. }) => update.clone(),
            StreamEvent::Trace(TraceEvent::TurnFinished { state }) => {
                serde_json::to_value(state).unwrap_or(Value::Null)
            }
        }
    }

    pub fn append(fragment: Fragment) -> Self {
        StreamEvent::UiFragment {
            mode: FragmentMode::Append,
            fragment,
        }
    }

    pub fn update(fragment: Fragment) -> Self {
        StreamEvent::UiFragment {
            mode: FragmentMode::Update,
            fragment,
        }
    }
}

/// Writing half of a turn's event sequence
///
/// Cloned into every node and tool side channel. Sends never fail loudly:
/// once the reader is gone the turn still runs to completion.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Result<StreamEvent, StreamFault>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<Result<StreamEvent, StreamFault>>) -> Self {
        Self { tx }
    }

    /// Channel-backed sink plus its reading half
    pub fn channel(
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Result<StreamEvent, StreamFault>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub async fn emit(&self, event: StreamEvent) {
        if self.tx.send(Ok(event)).await.is_err() {
            tracing::trace!("Event reader dropped, discarding event");
        }
    }

    pub async fn append(&self, fragment: Fragment) {
        self.emit(StreamEvent::append(fragment)).await;
    }

    pub async fn update(&self, fragment: Fragment) {
        self.emit(StreamEvent::update(fragment)).await;
    }

    pub async fn token(&self, run_id: &RunId, text: impl Into<String>) {
        self.emit(StreamEvent::TokenDelta {
            run_id: run_id.clone(),
            text: text.into(),
        })
        .await;
    }

    pub async fn trace(&self, event: TraceEvent) {
        self.emit(StreamEvent::Trace(event)).await;
    }

    /// Break the event sequence itself
    pub async fn fail(&self, fault: StreamFault) {
        if self.tx.send(Err(fault)).await.is_err() {
            tracing::trace!("Event reader dropped, discarding fault");
        }
    }
}
