//! API request and response types

use crate::llm::ToolDefinition;
use crate::state_machine::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to start a turn
#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub input: String,
}

/// Payload of the closing `done` event of a turn stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnDoneResponse {
    /// Final result payload (the terminal agent state)
    #[serde(rename = "final")]
    pub final_payload: Option<Value>,
    /// Presented text, as persisted
    pub text: Option<String>,
}

/// Response with stored conversation messages
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
}

/// Response for tool listing
#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
