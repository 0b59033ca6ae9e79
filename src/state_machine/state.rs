//! Agent state threaded through one turn

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Speaker of a history message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A request to invoke a named tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Backend-assigned identifier of the tool use
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub parameters: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parameters,
        }
    }
}

/// Everything a turn needs to start
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub input: String,
    pub history: Vec<ChatMessage>,
    /// Extra system context supplied by memory or retrieval collaborators
    pub preamble: Option<String>,
}

impl TurnInput {
    pub fn new(input: impl Into<String>, history: Vec<ChatMessage>) -> Self {
        Self {
            input: input.into(),
            history,
            preamble: None,
        }
    }

    #[must_use]
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }
}

/// Output of the `reason` node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonOutcome {
    ToolCall(ToolCall),
    Result(String),
    Error(String),
}

/// Output of the `execute` node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteOutcome {
    ToolResult(Map<String, Value>),
    Error(String),
}

/// Terminal condition of a finished turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome<'a> {
    Result(&'a str),
    ToolResult(&'a Map<String, Value>),
    Error(&'a str),
}

/// Mutable record owned by the state machine for the duration of a turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub input: String,
    pub history: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentState {
    pub fn new(input: impl Into<String>, history: Vec<ChatMessage>) -> Self {
        Self {
            input: input.into(),
            history,
            ..Self::default()
        }
    }

    pub fn apply_reason(&mut self, outcome: ReasonOutcome) {
        match outcome {
            ReasonOutcome::ToolCall(call) => self.tool_call = Some(call),
            ReasonOutcome::Result(text) => self.result = Some(text),
            ReasonOutcome::Error(message) => self.error = Some(message),
        }
    }

    pub fn apply_execute(&mut self, outcome: ExecuteOutcome) {
        match outcome {
            ExecuteOutcome::ToolResult(payload) => self.tool_result = Some(payload),
            ExecuteOutcome::Error(message) => self.error = Some(message),
        }
    }

    /// The single terminal condition, if exactly one holds
    pub fn outcome(&self) -> Option<TurnOutcome<'_>> {
        match (&self.result, &self.tool_result, &self.error) {
            (Some(text), None, None) => Some(TurnOutcome::Result(text)),
            (None, Some(payload), None) => Some(TurnOutcome::ToolResult(payload)),
            (None, None, Some(message)) => Some(TurnOutcome::Error(message)),
            _ => None,
        }
    }

    /// Number of terminal fields currently set
    pub fn terminal_count(&self) -> usize {
        usize::from(self.result.is_some())
            + usize::from(self.tool_result.is_some())
            + usize::from(self.error.is_some())
    }
}
