//! Turns a resolved final payload into the text persisted for the turn

use crate::state_machine::{AgentState, TurnOutcome};
use crate::tools::Builtin;
use serde_json::{Map, Value};

/// User-visible text for a final result payload.
///
/// Returns `None` when the payload is not a finished agent state.
pub fn present(payload: &Value) -> Option<String> {
    let state: AgentState = serde_json::from_value(payload.clone()).ok()?;
    present_state(&state)
}

pub fn present_state(state: &AgentState) -> Option<String> {
    let text = match state.outcome()? {
        TurnOutcome::Result(text) => text.to_string(),
        TurnOutcome::Error(message) => format!("Sorry, something went wrong: {message}"),
        TurnOutcome::ToolResult(payload) => {
            let tool = state.tool_call.as_ref().map_or("tool", |c| c.name.as_str());
            present_tool_result(tool, payload)
        }
    };
    Some(text)
}

fn present_tool_result(tool: &str, payload: &Map<String, Value>) -> String {
    match Builtin::from_name(tool) {
        Some(Builtin::CurrentTime) => match payload.get("iso").and_then(Value::as_str) {
            Some(iso) => format!("The current time is {iso}."),
            None => generic(tool, payload),
        },
        Some(Builtin::RollDice) => {
            let rolls: Vec<String> = payload
                .get("rolls")
                .and_then(Value::as_array)
                .map(|rolls| rolls.iter().map(Value::to_string).collect())
                .unwrap_or_default();
            match (rolls.as_slice(), payload.get("total")) {
                ([single], _) => format!("You rolled {single}."),
                ([], _) | (_, None) => generic(tool, payload),
                (many, Some(total)) => format!("You rolled {} (total {total}).", many.join(", ")),
            }
        }
        None => generic(tool, payload),
    }
}

fn generic(tool: &str, payload: &Map<String, Value>) -> String {
    if payload.keys().all(|key| key == "error") {
        return format!("{tool} finished.");
    }
    let fields: Vec<String> = payload
        .iter()
        .filter(|(key, _)| key.as_str() != "error")
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}: {s}"),
            other => format!("{key}: {other}"),
        })
        .collect();
    format!("{tool} returned {}", fields.join(", "))
}
