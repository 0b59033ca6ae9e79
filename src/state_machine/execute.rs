//! The `execute` node
//!
//! Looks the requested tool up, validates its parameters, runs it with a
//! fresh side channel and folds every failure into [`ExecuteOutcome::Error`].
//! Whatever happens, the UI is left without a dangling loading entry.

use super::{ExecuteOutcome, ToolCall, CANCELLED};
use crate::events::EventSink;
use crate::tools::{validate, SideChannel, ToolContext, ToolRegistry};
use crate::ui::Fragment;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub async fn execute(
    tools: &ToolRegistry,
    call: &ToolCall,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> ExecuteOutcome {
    let tool = match tools.lookup(&call.name) {
        Ok(tool) => tool,
        Err(e) => {
            tracing::warn!(tool = %call.name, "Unknown tool requested");
            return fail_before_run(sink, e.to_string()).await;
        }
    };

    if let Err(e) = validate(&tool.input_schema(), &call.parameters) {
        tracing::warn!(tool = %call.name, error = %e, "Tool parameters rejected");
        return fail_before_run(sink, format!("invalid parameters for tool '{}': {e}", call.name))
            .await;
    }

    let side = SideChannel::new(sink.clone(), &call.name);
    let ctx = ToolContext::new(side.clone(), cancel.child_token(), call.id.as_str());
    let started = Instant::now();

    let run = AssertUnwindSafe(tool.run(Value::Object(call.parameters.clone()), ctx)).catch_unwind();
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CANCELLED.to_string()),
        caught = run => match caught {
            Ok(Ok(value)) => interpret(value),
            Ok(Err(e)) => Err(format!("tool '{}' failed: {e}", call.name)),
            Err(panic) => Err(format!("tool '{}' panicked: {}", call.name, panic_message(&*panic))),
        },
    };

    let duration_ms = started.elapsed().as_millis();
    match result {
        Ok(payload) => {
            tracing::info!(tool = %call.name, duration_ms = %duration_ms, "Tool completed");
            let rendering = Fragment::ToolResult {
                tool: call.name.clone(),
                payload: Value::Object(payload.clone()),
            };
            if side.has_open_append() {
                sink.update(rendering).await;
            } else if !side.emitted() {
                sink.append(rendering).await;
            }
            ExecuteOutcome::ToolResult(payload)
        }
        Err(message) => {
            tracing::warn!(tool = %call.name, duration_ms = %duration_ms, error = %message, "Tool failed");
            if side.has_open_append() {
                sink.update(Fragment::error(message.as_str())).await;
            } else if !side.emitted() {
                sink.append(Fragment::error(message.as_str())).await;
            }
            ExecuteOutcome::Error(message)
        }
    }
}

async fn fail_before_run(sink: &EventSink, message: String) -> ExecuteOutcome {
    sink.append(Fragment::error(message.as_str())).await;
    ExecuteOutcome::Error(message)
}

/// Split a tool's structured result into payload or self-reported failure
fn interpret(value: Value) -> Result<Map<String, Value>, String> {
    let payload = match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            return Ok(map);
        }
    };

    let failure = match payload.get("error") {
        None | Some(Value::Null | Value::Bool(false)) => None,
        Some(Value::String(message)) if !message.is_empty() => Some(message.clone()),
        Some(Value::Object(detail)) => Some(
            detail
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| Value::Object(detail.clone()).to_string(), str::to_string),
        ),
        Some(other) => Some(format!("tool reported an error: {other}")),
    };

    match failure {
        Some(message) => Err(message),
        None => Ok(payload),
    }
}

pub(super) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
