//! Tools the reasoning step may invoke
//!
//! Tools are stateless singletons. Everything a single invocation needs,
//! including the side channel for UI fragments, arrives via [`ToolContext`].

mod clock;
mod dice;
mod registry;
mod schema;
mod side_channel;

pub use clock::CurrentTimeTool;
pub use dice::RollDiceTool;
pub use registry::{ToolLookupError, ToolRegistry};
pub use schema::{validate, SchemaError};
pub use side_channel::SideChannel;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure reported by a tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Failed(String),
    #[error("cancelled")]
    Cancelled,
}

/// All context needed for a tool invocation.
///
/// Created fresh for each tool call.
#[derive(Clone)]
pub struct ToolContext {
    /// Append/update channel for UI fragments
    pub side: SideChannel,

    /// Cancellation signal for long-running operations
    pub cancel: CancellationToken,

    /// Backend-assigned identifier of the call being served
    pub tool_call_id: String,
}

impl ToolContext {
    pub fn new(side: SideChannel, cancel: CancellationToken, tool_call_id: impl Into<String>) -> Self {
        Self {
            side,
            cancel,
            tool_call_id: tool_call_id.into(),
        }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within a registry
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool.
    ///
    /// A tool should emit at most one `append` followed by at most one
    /// `update` on `ctx.side`. The returned value is the structured result;
    /// a top-level `error` field marks a tool-reported failure.
    async fn run(&self, parameters: Value, ctx: ToolContext) -> Result<Value, ToolError>;
}

/// Capabilities shipped with the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    CurrentTime,
    RollDice,
}

impl Builtin {
    pub const ALL: [Builtin; 2] = [Builtin::CurrentTime, Builtin::RollDice];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::CurrentTime => "current_time",
            Builtin::RollDice => "roll_dice",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn tool(self) -> Arc<dyn Tool> {
        match self {
            Builtin::CurrentTime => Arc::new(CurrentTimeTool),
            Builtin::RollDice => Arc::new(RollDiceTool),
        }
    }
}
