//! Property-based tests for the routing state machine
//!
//! Whatever the nodes produce, a finished turn holds exactly one terminal
//! condition.

use super::*;
use crate::events::EventSink;
use crate::llm::{LlmChunk, LlmError};
use crate::runtime::testing::{Script, ScriptedLlm, WeatherTool};
use crate::tools::ToolRegistry;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tool_call() -> impl Strategy<Value = ToolCall> {
    ("[a-z]{8}", "[A-Za-z]{1,10}").prop_map(|(id, name)| ToolCall::new(id, name, Map::new()))
}

fn arb_reason_outcome() -> impl Strategy<Value = ReasonOutcome> {
    prop_oneof![
        arb_tool_call().prop_map(ReasonOutcome::ToolCall),
        "[a-z ]{1,30}".prop_map(ReasonOutcome::Result),
        "[a-z ]{1,30}".prop_map(ReasonOutcome::Error),
    ]
}

fn arb_execute_outcome() -> impl Strategy<Value = ExecuteOutcome> {
    prop_oneof![
        (0i64..100).prop_map(|n| {
            let mut payload = Map::new();
            payload.insert("n".to_string(), json!(n));
            ExecuteOutcome::ToolResult(payload)
        }),
        "[a-z ]{1,30}".prop_map(ExecuteOutcome::Error),
    ]
}

fn arb_chunk() -> impl Strategy<Value = Result<LlmChunk, LlmError>> {
    prop_oneof![
        4 => "[a-z ]{0,8}".prop_map(|t| Ok(LlmChunk::TextDelta(t))),
        2 => prop_oneof![Just("Weather"), Just("Nonexistent")].prop_map(|name| Ok(LlmChunk::ToolUse {
            id: "toolu".to_string(),
            name: name.to_string(),
            input: json!({"city": "Paris"}),
        })),
        1 => Just(Ok(LlmChunk::ToolUse {
            id: "toolu".to_string(),
            name: "Weather".to_string(),
            input: Value::Null,
        })),
        1 => Just(Err(LlmError::network("connection reset"))),
    ]
}

/// Pure replay of the graph's routing over given node outcomes
fn replay(reason: ReasonOutcome, execute: ExecuteOutcome) -> Result<AgentState, RoutingError> {
    let mut state = AgentState::new("input", vec![]);
    let mut node = Node::Reason;
    loop {
        match node {
            Node::Reason => state.apply_reason(reason.clone()),
            Node::Execute => state.apply_execute(execute.clone()),
        }
        match route(node, &state)? {
            Route::Next(next) => node = next,
            Route::Done => return Ok(state),
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_exactly_one_terminal(reason in arb_reason_outcome(), execute in arb_execute_outcome()) {
        let state = replay(reason, execute).unwrap();
        prop_assert_eq!(state.terminal_count(), 1, "state: {:?}", state);
        prop_assert!(state.outcome().is_some());
    }

    #[test]
    fn prop_execute_runs_only_after_tool_call(reason in arb_reason_outcome(), execute in arb_execute_outcome()) {
        let proposed_tool = matches!(reason, ReasonOutcome::ToolCall(_));
        let state = replay(reason, execute).unwrap();
        prop_assert_eq!(state.tool_call.is_some(), proposed_tool);
        if !proposed_tool {
            prop_assert!(state.tool_result.is_none());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_graph_terminates_once(chunks in proptest::collection::vec(arb_chunk(), 0..6)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let state = rt.block_on(async {
            let tools = ToolRegistry::new().with(Arc::new(WeatherTool)).unwrap();
            let graph = TurnGraph::new(
                Arc::new(ScriptedLlm::new(vec![Script::Chunks(chunks)])),
                Arc::new(tools),
                ReasonOptions::default(),
            );
            let (sink, mut rx) = EventSink::channel(8);
            let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
            let state = graph
                .run(TurnInput::new("hi", vec![]), &sink, &CancellationToken::new())
                .await;
            drop(sink);
            drain.await.unwrap();
            state
        });
        let state = state.unwrap();
        prop_assert_eq!(state.terminal_count(), 1, "state: {:?}", state);
    }
}
