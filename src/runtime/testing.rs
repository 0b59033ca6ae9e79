//! Mock implementations for testing
//!
//! A scripted reasoning backend, a handful of tools covering every dispatch
//! path, and canned context providers.

use super::traits::*;
use crate::llm::{LlmChunk, LlmError, LlmRequest, LlmService, LlmStream, Usage};
use crate::state_machine::ChatMessage;
use crate::tools::{Tool, ToolContext, ToolError};
use crate::ui::{CardField, Fragment};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::task::Poll;

// ============================================================================
// Scripted LLM
// ============================================================================

/// One scripted backend response
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream these chunks, then end
    Chunks(Vec<Result<LlmChunk, LlmError>>),
    /// Stream these chunks, then never finish
    Stall(Vec<Result<LlmChunk, LlmError>>),
    /// Refuse to open the stream
    Fail(LlmError),
    /// Panic while opening the stream
    Panic,
    /// Stream these chunks, then panic on the next poll
    PanicMidStream(Vec<Result<LlmChunk, LlmError>>),
}

/// Mock backend answering each request with the next queued script
pub struct ScriptedLlm {
    scripts: Mutex<VecDeque<Script>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Streams `deltas` as text and finishes
    pub fn text(deltas: &[&str]) -> Self {
        let mut chunks: Vec<_> = deltas
            .iter()
            .map(|d| Ok(LlmChunk::TextDelta((*d).to_string())))
            .collect();
        chunks.push(Ok(finished()));
        Self::new(vec![Script::Chunks(chunks)])
    }

    /// Proposes each `(name, input)` as a tool call in one response
    pub fn tool_calls(calls: &[(&str, Value)]) -> Self {
        let mut chunks: Vec<_> = calls
            .iter()
            .enumerate()
            .map(|(i, (name, input))| {
                Ok(LlmChunk::ToolUse {
                    id: format!("toolu_{i}"),
                    name: (*name).to_string(),
                    input: input.clone(),
                })
            })
            .collect();
        chunks.push(Ok(finished()));
        Self::new(vec![Script::Chunks(chunks)])
    }

    pub fn failing(error: LlmError) -> Self {
        Self::new(vec![Script::Fail(error)])
    }

    /// Streams `deltas` and then hangs until the turn is cancelled
    pub fn stalling(deltas: &[&str]) -> Self {
        let chunks = deltas
            .iter()
            .map(|d| Ok(LlmChunk::TextDelta((*d).to_string())))
            .collect();
        Self::new(vec![Script::Stall(chunks)])
    }

    /// A backend with a bug: panics as soon as it is called
    pub fn panicking() -> Self {
        Self::new(vec![Script::Panic])
    }

    /// Streams `deltas`, then panics before finishing
    pub fn panicking_after(deltas: &[&str]) -> Self {
        let chunks = deltas
            .iter()
            .map(|d| Ok(LlmChunk::TextDelta((*d).to_string())))
            .collect();
        Self::new(vec![Script::PanicMidStream(chunks)])
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn finished() -> LlmChunk {
    LlmChunk::Finished {
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
            ..Usage::default()
        },
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Chunks(chunks)) => Ok(futures::stream::iter(chunks).boxed()),
            Some(Script::Stall(chunks)) => Ok(futures::stream::iter(chunks)
                .chain(futures::stream::pending())
                .boxed()),
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Panic) => panic!("scripted backend panic"),
            Some(Script::PanicMidStream(chunks)) => Ok(futures::stream::iter(chunks)
                .chain(futures::stream::poll_fn(
                    |_| -> Poll<Option<Result<LlmChunk, LlmError>>> {
                        panic!("scripted backend panic mid-stream")
                    },
                ))
                .boxed()),
            None => Err(LlmError::network("No scripted response queued")),
        }
    }

    fn model_id(&self) -> &'static str {
        "scripted"
    }
}

// ============================================================================
// Mock tools
// ============================================================================

/// Well-behaved tool: loading placeholder, then a card, then `{temp_c: 18}`
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &'static str {
        "Weather"
    }

    fn description(&self) -> String {
        "Current weather for a city".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["city"],
            "properties": {"city": {"type": "string"}}
        })
    }

    async fn run(&self, parameters: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        let city = parameters["city"].as_str().unwrap_or("somewhere").to_string();
        ctx.side
            .append(Fragment::loading(format!("Checking the weather in {city}")))
            .await;
        ctx.side.update(weather_card(&city)).await;
        Ok(json!({"temp_c": 18}))
    }
}

pub fn weather_card(city: &str) -> Fragment {
    Fragment::card(city, vec![CardField::new("Temperature", "18°C")])
}

/// Renders its own failure, then reports it
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &'static str {
        "Failing"
    }

    fn description(&self) -> String {
        "Always fails after rendering".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn run(&self, _parameters: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        ctx.side.append(Fragment::loading("Contacting sensor")).await;
        ctx.side.update(Fragment::error("Sensor offline")).await;
        Err(ToolError::Failed("sensor offline".to_string()))
    }
}

/// Panics while its loading placeholder is showing
pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &'static str {
        "Panicking"
    }

    fn description(&self) -> String {
        "Panics mid-invocation".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn run(&self, _parameters: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        ctx.side.append(Fragment::loading("Working")).await;
        panic!("weather station exploded");
    }
}

/// Reports failure through its result payload
pub struct ErrorPayloadTool;

#[async_trait]
impl Tool for ErrorPayloadTool {
    fn name(&self) -> &'static str {
        "ErrorPayload"
    }

    fn description(&self) -> String {
        "Returns an error payload".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn run(&self, _parameters: Value, _ctx: ToolContext) -> Result<Value, ToolError> {
        Ok(json!({"error": "upstream unavailable"}))
    }
}

/// Never touches the side channel
pub struct SilentTool;

#[async_trait]
impl Tool for SilentTool {
    fn name(&self) -> &'static str {
        "Silent"
    }

    fn description(&self) -> String {
        "Returns data without rendering".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn run(&self, _parameters: Value, _ctx: ToolContext) -> Result<Value, ToolError> {
        Ok(json!({"ok": true}))
    }
}

/// Appends a placeholder and returns without ever updating it
pub struct ForgetfulTool;

#[async_trait]
impl Tool for ForgetfulTool {
    fn name(&self) -> &'static str {
        "Forgetful"
    }

    fn description(&self) -> String {
        "Shows progress but never its finished rendering".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn run(&self, _parameters: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        ctx.side.append(Fragment::loading("working")).await;
        Ok(json!({"ok": true}))
    }
}

/// Appends a placeholder and waits for cancellation
pub struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &'static str {
        "Slow"
    }

    fn description(&self) -> String {
        "Runs until cancelled".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn run(&self, _parameters: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        ctx.side.append(Fragment::loading("Thinking hard")).await;
        ctx.cancel.cancelled().await;
        Err(ToolError::Cancelled)
    }
}

// ============================================================================
// Context providers
// ============================================================================

/// Provider returning fixed context
#[derive(Default)]
pub struct StaticContext {
    pub history: Vec<ChatMessage>,
    pub preamble: Option<String>,
}

impl StaticContext {
    pub fn preamble(text: &str) -> Self {
        Self {
            history: Vec::new(),
            preamble: Some(text.to_string()),
        }
    }
}

#[async_trait]
impl ContextProvider for StaticContext {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn provide(
        &self,
        _conversation_id: &str,
        _input: &str,
    ) -> Result<ProvidedContext, StoreError> {
        Ok(ProvidedContext {
            history: self.history.clone(),
            preamble: self.preamble.clone(),
        })
    }
}

/// Provider that is always down
pub struct FailingContext;

#[async_trait]
impl ContextProvider for FailingContext {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn provide(
        &self,
        _conversation_id: &str,
        _input: &str,
    ) -> Result<ProvidedContext, StoreError> {
        Err(StoreError::Backend("memory index offline".to_string()))
    }
}
