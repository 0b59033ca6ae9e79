//! Turn runtime
//!
//! Ties the routing graph to the multiplexer: one call starts a turn and
//! hands back the incremental UI output, the final result, and a
//! cancellation handle.

mod traits;

#[cfg(test)]
mod scenarios;
#[cfg(test)]
pub mod testing;

pub use traits::*;

use crate::llm::LlmService;
use crate::multiplexer::{multiplex, FinalResult, UiOutputSequence};
use crate::state_machine::{ReasonOptions, TurnGraph, TurnInput, DEFAULT_EVENT_BUFFER, DEFAULT_SYSTEM_PROMPT};
use crate::tools::ToolRegistry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-runtime settings
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
    /// Capacity of the channel between the graph and the multiplexer
    pub event_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Handles for one running turn
///
/// Dropping `ui` does not stop the turn; it runs to completion and `result`
/// still resolves. Use [`TurnHandle::cancel`] to stop it early.
pub struct TurnHandle {
    pub ui: UiOutputSequence,
    pub result: FinalResult,
    pub cancel: CancellationToken,
}

impl TurnHandle {
    /// Ask the running node to give up; the turn ends with an error state
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Starts turns against a fixed backend and tool registry
#[derive(Clone)]
pub struct TurnRuntime {
    graph: TurnGraph,
}

impl TurnRuntime {
    pub fn new(llm: Arc<dyn LlmService>, registry: Arc<ToolRegistry>, config: RuntimeConfig) -> Self {
        let options = ReasonOptions {
            system_prompt: config.system_prompt,
            max_tokens: config.max_tokens,
        };
        Self {
            graph: TurnGraph::new(llm, registry, options).with_event_buffer(config.event_buffer),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.graph.tools()
    }

    pub fn run_turn(&self, input: TurnInput) -> TurnHandle {
        self.run_turn_with_cancel(input, CancellationToken::new())
    }

    /// Like [`run_turn`](Self::run_turn), driven by a caller-owned token
    pub fn run_turn_with_cancel(&self, input: TurnInput, cancel: CancellationToken) -> TurnHandle {
        tracing::debug!(
            history = input.history.len(),
            preamble = input.preamble.is_some(),
            "Starting turn"
        );
        let events = self.graph.stream(input, cancel.clone());
        let (ui, result) = multiplex(events);
        TurnHandle { ui, result, cancel }
    }
}
