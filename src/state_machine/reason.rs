//! The `reason` node
//!
//! One streamed backend call per invocation. Text deltas are forwarded under
//! a fresh [`RunId`] as they arrive; the node then decides between a direct
//! result and a single tool call. Failures never escape: they become
//! [`ReasonOutcome::Error`] plus an error fragment.

use super::{AgentState, ReasonOutcome, Role, ToolCall, CANCELLED};
use crate::events::{EventSink, RunId};
use crate::llm::{LlmChunk, LlmMessage, LlmRequest, LlmService, SystemContent};
use crate::tools::ToolRegistry;
use crate::ui::Fragment;
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer directly when you can. \
When the user needs something one of your tools provides, call exactly one tool instead of answering.";

/// Knobs for building the backend request
#[derive(Debug, Clone)]
pub struct ReasonOptions {
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
}

impl Default for ReasonOptions {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: None,
        }
    }
}

/// Fixed system instruction, history, then the current input
pub fn build_request(
    options: &ReasonOptions,
    tools: &ToolRegistry,
    state: &AgentState,
    preamble: Option<&str>,
) -> LlmRequest {
    let mut system = vec![SystemContent::cached(options.system_prompt.as_str())];
    if let Some(preamble) = preamble.filter(|p| !p.trim().is_empty()) {
        system.push(SystemContent::new(preamble));
    }

    let mut messages: Vec<LlmMessage> = state
        .history
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| match m.role {
            Role::User => LlmMessage::user(m.content.as_str()),
            Role::Assistant => LlmMessage::assistant(m.content.as_str()),
        })
        .collect();
    messages.push(LlmMessage::user(state.input.as_str()));

    LlmRequest {
        system,
        messages,
        tools: tools.definitions(),
        max_tokens: options.max_tokens,
    }
}

/// Run the node against `request`
pub async fn reason(
    llm: &dyn LlmService,
    request: &LlmRequest,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> ReasonOutcome {
    let run_id = RunId::generate();
    tracing::debug!(run_id = %run_id, model = llm.model_id(), "Reasoning");

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => ReasonOutcome::Error(CANCELLED.to_string()),
        outcome = consume(llm, request, &run_id, sink) => outcome,
    };

    if let ReasonOutcome::Error(message) = &outcome {
        tracing::warn!(run_id = %run_id, error = %message, "Reasoning failed");
        sink.append(Fragment::error(format!(
            "Sorry, I couldn't complete that request: {message}"
        )))
        .await;
    }

    outcome
}

async fn consume(
    llm: &dyn LlmService,
    request: &LlmRequest,
    run_id: &RunId,
    sink: &EventSink,
) -> ReasonOutcome {
    let mut stream = match llm.stream(request).await {
        Ok(stream) => stream,
        Err(e) => return ReasonOutcome::Error(e.message),
    };

    let mut text = String::new();
    let mut calls = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(LlmChunk::TextDelta(delta)) => {
                if delta.is_empty() {
                    continue;
                }
                text.push_str(&delta);
                sink.token(run_id, delta).await;
            }
            Ok(LlmChunk::ToolUse { id, name, input }) => calls.push((id, name, input)),
            Ok(LlmChunk::Finished { .. }) => break,
            Err(e) => return ReasonOutcome::Error(e.message),
        }
    }

    let mut calls = calls.into_iter();
    if let Some((id, name, input)) = calls.next() {
        let dropped = calls.count();
        if dropped > 0 {
            tracing::warn!(
                tool = %name,
                dropped,
                "Backend proposed several tool calls; only the first is honored"
            );
        }
        return match input {
            Value::Object(parameters) => ReasonOutcome::ToolCall(ToolCall::new(id, name, parameters)),
            other => ReasonOutcome::Error(format!(
                "tool '{name}' was proposed with non-object arguments: {other}"
            )),
        };
    }

    if text.trim().is_empty() {
        ReasonOutcome::Error("the model returned an empty response".to_string())
    } else {
        ReasonOutcome::Result(text)
    }
}
