//! Runs the two-node graph for one turn and emits its event sequence

use super::execute::{execute, panic_message};
use super::reason::{build_request, reason, ReasonOptions};
use super::transition::{route, Node, Route, RoutingError};
use super::{AgentState, TurnInput};
use crate::events::{EventSink, StreamEvent, TraceEvent};
use crate::llm::LlmService;
use crate::multiplexer::StreamFault;
use crate::tools::ToolRegistry;
use futures::{FutureExt, Stream};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// `START -> reason -> (execute | done)`, `execute -> done`
#[derive(Clone)]
pub struct TurnGraph {
    llm: Arc<dyn LlmService>,
    tools: Arc<ToolRegistry>,
    options: ReasonOptions,
    event_buffer: usize,
}

impl TurnGraph {
    pub fn new(llm: Arc<dyn LlmService>, tools: Arc<ToolRegistry>, options: ReasonOptions) -> Self {
        Self {
            llm,
            tools,
            options,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    #[must_use]
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Start the turn on a background task and return its event sequence.
    ///
    /// The sequence ends once the turn reaches a terminal state. A routing
    /// failure ends it with a single `Err`, and so does a panic anywhere in
    /// the runner outside a tool.
    pub fn stream(
        &self,
        input: TurnInput,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<StreamEvent, StreamFault>> + Send + 'static {
        let (sink, rx) = EventSink::channel(self.event_buffer);
        let graph = self.clone();

        tokio::spawn(async move {
            let run = AssertUnwindSafe(graph.run(input, &sink, &cancel)).catch_unwind();
            match run.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Turn could not be routed");
                    sink.fail(e.into()).await;
                }
                Err(panic) => {
                    tracing::error!(panic = panic_message(&*panic), "Turn runner panicked");
                    sink.fail(StreamFault::interrupted()).await;
                }
            }
        });

        ReceiverStream::new(rx)
    }

    /// Drive the graph to a terminal state, emitting events into `sink`
    pub async fn run(
        &self,
        input: TurnInput,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<AgentState, RoutingError> {
        let TurnInput {
            input,
            history,
            preamble,
        } = input;
        let mut state = AgentState::new(input, history);
        sink.trace(TraceEvent::TurnStarted {
            input: state.input.clone(),
        })
        .await;

        let mut node = Node::Reason;
        loop {
            sink.trace(TraceEvent::NodeStarted { node }).await;

            let update = match node {
                Node::Reason => {
                    let request =
                        build_request(&self.options, &self.tools, &state, preamble.as_deref());
                    let outcome = reason(self.llm.as_ref(), &request, sink, cancel).await;
                    let update = serde_json::to_value(&outcome).unwrap_or(Value::Null);
                    state.apply_reason(outcome);
                    update
                }
                Node::Execute => {
                    let call = state.tool_call.clone().ok_or(RoutingError::MissingToolCall)?;
                    let outcome = execute(&self.tools, &call, sink, cancel).await;
                    let update = serde_json::to_value(&outcome).unwrap_or(Value::Null);
                    state.apply_execute(outcome);
                    update
                }
            };

            sink.trace(TraceEvent::NodeFinished { node, update }).await;

            match route(node, &state)? {
                Route::Next(next) => node = next,
                Route::Done => break,
            }
        }

        tracing::info!(
            tool = state.tool_call.as_ref().map(|c| c.name.as_str()),
            failed = state.error.is_some(),
            "Turn finished"
        );
        sink.trace(TraceEvent::TurnFinished {
            state: state.clone(),
        })
        .await;
        Ok(state)
    }
}
