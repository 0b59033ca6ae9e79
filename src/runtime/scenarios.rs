//! End-to-end turns through the runtime with scripted collaborators

use super::testing::*;
use super::*;
use crate::multiplexer::StreamFault;
use crate::state_machine::CANCELLED;
use crate::ui::{Fragment, UiDocument, UiEntry, UiPatch};
use futures::{FutureExt, StreamExt};
use serde_json::{json, Value};

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WeatherTool)).unwrap();
    registry.register(Arc::new(PanickingTool)).unwrap();
    registry.register(Arc::new(SlowTool)).unwrap();
    registry.register(Arc::new(SilentTool)).unwrap();
    registry.register(Arc::new(ForgetfulTool)).unwrap();
    Arc::new(registry)
}

fn runtime(llm: ScriptedLlm) -> (TurnRuntime, Arc<ScriptedLlm>) {
    let llm = Arc::new(llm);
    let runtime = TurnRuntime::new(llm.clone(), registry(), RuntimeConfig::default());
    (runtime, llm)
}

async fn run(llm: ScriptedLlm, input: &str) -> (UiDocument, Value) {
    let (runtime, _) = runtime(llm);
    let handle = runtime.run_turn(TurnInput::new(input, vec![]));
    let document = UiDocument::collect(handle.ui).await.unwrap();
    let payload = handle.result.await.unwrap().unwrap();
    (document, payload)
}

fn fragments(document: &UiDocument) -> Vec<&Fragment> {
    document
        .entries()
        .iter()
        .filter_map(|e| match e {
            UiEntry::Fragment { fragment } => Some(fragment),
            UiEntry::Stream { .. } => None,
        })
        .collect()
}

#[tokio::test]
async fn direct_answer_streams_one_text_entry() {
    let (document, payload) = run(ScriptedLlm::text(&["hel", "lo"]), "hi").await;

    assert_eq!(document.texts(), vec!["hello".to_string()]);
    assert!(!document.has_pending());
    assert_eq!(payload["result"], "hello");
    assert!(payload.get("error").is_none());
}

#[tokio::test]
async fn tool_rendering_replaces_its_placeholder() {
    let llm = ScriptedLlm::tool_calls(&[("Weather", json!({"city": "Paris"}))]);
    let (document, payload) = run(llm, "weather in Paris?").await;

    assert_eq!(document.len(), 1);
    assert_eq!(fragments(&document), vec![&weather_card("Paris")]);
    assert_eq!(payload["tool_result"], json!({"temp_c": 18}));
    assert_eq!(payload["tool_call"]["name"], "Weather");
}

#[tokio::test]
async fn unknown_tool_shows_one_error() {
    let llm = ScriptedLlm::tool_calls(&[("Nonexistent", json!({}))]);
    let (document, payload) = run(llm, "do the thing").await;

    assert_eq!(document.len(), 1);
    assert!(fragments(&document)[0].is_error());
    assert!(payload["error"].as_str().unwrap().contains("Nonexistent"));
    assert!(payload.get("tool_result").is_none());
}

#[tokio::test]
async fn panicking_tool_leaves_no_loading_entry() {
    let llm = ScriptedLlm::tool_calls(&[("Panicking", json!({}))]);
    let (document, payload) = run(llm, "explode").await;

    assert!(!document.has_pending());
    assert!(fragments(&document).last().unwrap().is_error());
    assert!(payload["error"].as_str().unwrap().contains("panicked"));
}

#[tokio::test]
async fn only_first_of_several_tool_calls_runs() {
    let llm = ScriptedLlm::tool_calls(&[
        ("Weather", json!({"city": "Paris"})),
        ("Weather", json!({"city": "Rome"})),
    ]);
    let (runtime, llm) = runtime(llm);
    let handle = runtime.run_turn(TurnInput::new("two cities", vec![]));
    let document = UiDocument::collect(handle.ui).await.unwrap();
    let payload = handle.result.await.unwrap().unwrap();

    assert_eq!(fragments(&document), vec![&weather_card("Paris")]);
    assert_eq!(payload["tool_call"]["parameters"]["city"], "Paris");
    assert_eq!(llm.recorded_requests().len(), 1);
}

#[tokio::test]
async fn silent_tool_gets_exactly_one_wrapped_entry() {
    let llm = ScriptedLlm::tool_calls(&[("Silent", json!({}))]);
    let (document, payload) = run(llm, "quietly").await;

    assert_eq!(document.len(), 1);
    assert!(matches!(
        fragments(&document)[0],
        Fragment::ToolResult { tool, payload } if tool == "Silent" && payload["ok"] == true
    ));
    assert_eq!(payload["tool_result"]["ok"], true);
}

#[tokio::test]
async fn backend_failure_resolves_with_error() {
    let (document, payload) = run(
        ScriptedLlm::failing(crate::llm::LlmError::rate_limit("slow down")),
        "hi",
    )
    .await;

    assert_eq!(document.len(), 1);
    assert!(fragments(&document)[0].is_error());
    assert_eq!(payload["error"], "slow down");
}

#[tokio::test]
async fn result_resolves_after_ui_closed() {
    let (runtime, _) = runtime(ScriptedLlm::text(&["a", "b"]));
    let mut handle = runtime.run_turn(TurnInput::new("hi", vec![]));

    let payload = (&mut handle.result).await.unwrap().unwrap();
    assert_eq!(payload["result"], "ab");

    let mut document = UiDocument::new();
    loop {
        match handle.ui.next().now_or_never() {
            Some(Some(patch)) => document.apply(patch.unwrap()),
            Some(None) => break,
            None => panic!("UI sequence still open after final result resolved"),
        }
    }
    assert_eq!(document.texts(), vec!["ab".to_string()]);
}

#[tokio::test]
async fn abandoned_ui_still_runs_to_completion() {
    let llm = ScriptedLlm::tool_calls(&[("Weather", json!({"city": "Oslo"}))]);
    let (runtime, _) = runtime(llm);
    let handle = runtime.run_turn(TurnInput::new("weather?", vec![]));
    drop(handle.ui);

    let payload = handle.result.await.unwrap().unwrap();
    assert_eq!(payload["tool_result"]["temp_c"], 18);
}

#[tokio::test]
async fn cancel_while_reasoning() {
    let (runtime, _) = runtime(ScriptedLlm::stalling(&["thinking"]));
    let mut handle = runtime.run_turn(TurnInput::new("hi", vec![]));

    let mut document = UiDocument::new();
    while let Some(patch) = handle.ui.next().await {
        let patch = patch.unwrap();
        if matches!(patch, UiPatch::StreamDelta { .. }) {
            handle.cancel();
        }
        document.apply(patch);
    }
    let payload = handle.result.await.unwrap().unwrap();

    assert_eq!(payload["error"], CANCELLED);
    assert_eq!(document.texts()[0], "thinking");
    assert!(!document.has_pending());
    assert!(fragments(&document).last().unwrap().is_error());
}

#[tokio::test]
async fn cancel_while_tool_runs() {
    let (runtime, _) = runtime(ScriptedLlm::tool_calls(&[("Slow", json!({}))]));
    let mut handle = runtime.run_turn(TurnInput::new("take your time", vec![]));

    let mut document = UiDocument::new();
    while let Some(patch) = handle.ui.next().await {
        let patch = patch.unwrap();
        document.apply(patch);
        if document.has_pending() {
            handle.cancel();
        }
    }
    let payload = handle.result.await.unwrap().unwrap();

    assert_eq!(payload["error"], CANCELLED);
    assert_eq!(document.len(), 1);
    assert!(fragments(&document)[0].is_error());
}

#[tokio::test]
async fn placeholder_left_open_by_tool_is_finished() {
    let llm = ScriptedLlm::tool_calls(&[("Forgetful", json!({}))]);
    let (document, payload) = run(llm, "do it").await;

    assert!(!document.has_pending());
    assert_eq!(document.len(), 1);
    assert!(matches!(
        fragments(&document)[0],
        Fragment::ToolResult { tool, .. } if tool == "Forgetful"
    ));
    assert_eq!(payload["tool_result"]["ok"], true);
}

#[tokio::test]
async fn backend_panic_breaks_the_sequence() {
    let (runtime, _) = runtime(ScriptedLlm::panicking());
    let handle = runtime.run_turn(TurnInput::new("hi", vec![]));

    assert_eq!(
        UiDocument::collect(handle.ui).await.unwrap_err(),
        StreamFault::Interrupted
    );
    assert_eq!(handle.result.await, Err(StreamFault::Interrupted));
}

#[tokio::test]
async fn panic_mid_stream_faults_after_streamed_text() {
    let (runtime, _) = runtime(ScriptedLlm::panicking_after(&["par", "tial"]));
    let mut handle = runtime.run_turn(TurnInput::new("hi", vec![]));

    let mut document = UiDocument::new();
    let mut fault = None;
    while let Some(item) = handle.ui.next().await {
        match item {
            Ok(patch) => document.apply(patch),
            Err(e) => fault = Some(e),
        }
    }

    assert_eq!(fault, Some(StreamFault::Interrupted));
    assert_eq!(document.texts(), vec!["partial".to_string()]);
    assert!(handle.result.await.is_err());
}
