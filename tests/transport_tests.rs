//! The engine driven end to end over each transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use pretty_assertions::assert_eq;

use common::*;
use turnkit::config::RuntimeConfig;
use turnkit::engine::Engine;
use turnkit::error::TurnkitError;
use turnkit::events::{AgentEventKind, SseEvent};
use turnkit::runtime::{Orchestrator, SubmitTurn};
use turnkit::transport::ipc::EVENT_CHANNEL;
use turnkit::transport::{forward_events, EventBusTransport, IpcTransport, SseTransport, Transport};
use turnkit::types::ModelMessage;

fn ask_color_model() -> Arc<ScriptedChatModel> {
    let model = Arc::new(ScriptedChatModel::new());
    model
        .queue_tool_call("call_1", "ask_human", r#"{"question":"Which color?"}"#)
        .queue_text(&["You chose ", "green"]);
    model
}

/// Wait (bounded) until `check` holds, yielding to other tasks between tries.
async fn wait_until(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition never held");
}

fn names(kinds: &[AgentEventKind]) -> Vec<&'static str> {
    kinds
        .iter()
        .map(|kind| match kind {
            AgentEventKind::Thinking(_) => "thinking",
            AgentEventKind::Message(_) => "message",
            AgentEventKind::ToolCall(_) => "tool_call",
            AgentEventKind::ToolResult(_) => "tool_result",
            AgentEventKind::Error(_) => "error",
            AgentEventKind::Status(_) => "status",
        })
        .collect()
}

#[tokio::test]
async fn event_bus_round_trips_a_human_question() {
    let bus = Arc::new(EventBusTransport::new());
    let mut events = bus.subscribe();
    let engine = Engine::new(ask_human_loop(ask_color_model()));

    let transport: Arc<dyn Transport> = bus.clone();
    let run = tokio::spawn(async move { engine.run(vec![ModelMessage::user("pick")], transport).await });

    wait_until(|| bus.awaiting_input()).await;
    assert!(bus.send_input("green"));
    assert!(!bus.send_input("again"));

    let outcome = run.await.unwrap().unwrap();
    // the question goes out through the tool, not the model stream
    assert_eq!(outcome.final_text, "You chose green");

    let mut kinds = Vec::new();
    while let Some(Some(event)) = futures::FutureExt::now_or_never(events.next()) {
        kinds.push(event.kind);
    }
    assert_eq!(
        names(&kinds),
        vec!["tool_call", "message", "tool_result", "message", "message"]
    );
    match &kinds[2] {
        AgentEventKind::ToolResult(result) => {
            assert!(result.ok);
            assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
            assert_eq!(result.output, serde_json::json!("green"));
        }
        other => panic!("expected a tool result, got {other:?}"),
    }
}

#[tokio::test]
async fn ipc_frames_arrive_on_the_event_channel() {
    let (transport, mut handle) = IpcTransport::channel();
    let engine = Engine::new(ask_human_loop(ask_color_model()));
    let run = tokio::spawn(async move {
        engine
            .run(vec![ModelMessage::user("pick")], Arc::new(transport))
            .await
    });

    let mut frames = Vec::new();
    while let Some(frame) = handle.recv().await {
        let question = matches!(&frame.payload.kind, AgentEventKind::Message(text) if text == "Which color?");
        frames.push(frame);
        if question {
            break;
        }
    }
    wait_until(|| handle.awaiting_input()).await;
    assert!(handle.send_input("green"));

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome.history.len(), 4);
    while let Some(frame) = handle.recv().await {
        frames.push(frame);
    }
    assert!(frames.iter().all(|f| f.channel == EVENT_CHANNEL));
    assert_eq!(frames.len(), 5);
}

#[tokio::test]
async fn dropped_ipc_peer_fails_the_run() {
    let (transport, handle) = IpcTransport::channel();
    drop(handle);
    let engine = Engine::new(ScriptedGraph::new(Script::Text(vec!["hi"])));

    let err = engine
        .run(vec![ModelMessage::user("hi")], Arc::new(transport))
        .await
        .unwrap_err();
    assert!(matches!(err, TurnkitError::Transport(_)));
}

#[tokio::test]
async fn sse_transport_writes_one_frame_per_event() {
    let sse = Arc::new(SseTransport::new(Vec::<u8>::new()));
    let engine = Engine::new(ScriptedGraph::new(Script::Text(vec!["Hello", " world"])));
    let outcome = engine
        .run(vec![ModelMessage::user("hi")], sse.clone())
        .await
        .unwrap();
    assert_eq!(outcome.final_text, "Hello world");

    let body = String::from_utf8(Arc::try_unwrap(sse).ok().unwrap().into_inner()).unwrap();
    let payloads: Vec<String> = body
        .split_terminator("\n\n")
        .map(|frame| {
            let value: serde_json::Value =
                serde_json::from_str(frame.strip_prefix("data: ").unwrap()).unwrap();
            value["payload"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(payloads, vec!["Hello", " world"]);
}

#[tokio::test]
async fn sse_input_handle_answers_a_pending_question() {
    let sse = Arc::new(SseTransport::new(Vec::<u8>::new()));
    let input = sse.input_handle();
    let engine = Engine::new(ask_human_loop(ask_color_model()));
    let transport: Arc<dyn Transport> = sse.clone();
    let run = tokio::spawn(async move { engine.run(vec![ModelMessage::user("pick")], transport).await });

    wait_until(|| input.awaiting_input()).await;
    assert!(input.send_input("green"));
    let outcome = run.await.unwrap().unwrap();
    assert!(outcome.final_text.ends_with("You chose green"));
}

#[tokio::test]
async fn stream_failure_emits_exactly_one_error() {
    let bus = Arc::new(EventBusTransport::new());
    let mut events = bus.subscribe();
    let engine = Engine::new(ScriptedGraph::new(Script::Fail("connection reset")));

    let err = engine
        .run(vec![ModelMessage::user("hi")], bus.clone())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Stream error: connection reset");

    let mut kinds = Vec::new();
    while let Some(Some(event)) = futures::FutureExt::now_or_never(events.next()) {
        kinds.push(event.kind);
    }
    assert_eq!(
        kinds,
        vec![
            AgentEventKind::Message("partial".into()),
            AgentEventKind::Error("Stream error: connection reset".into()),
        ]
    );
}

#[tokio::test]
async fn orchestrator_feed_forwards_as_sse_frames() {
    let orchestrator = Orchestrator::new(
        RuntimeConfig::default(),
        StaticFactory::new(ScriptedGraph::new(Script::Text(vec!["a", "b"]))),
    );
    let events = orchestrator.stream("s1").await.unwrap();
    orchestrator
        .submit_turn(SubmitTurn::builder().session_id("s1").input("go").build())
        .await
        .unwrap();

    let mut out = Vec::new();
    let written = forward_events(events.take(5), &mut out).await.unwrap();
    assert_eq!(written, 5);

    let body = String::from_utf8(out).unwrap();
    let frames: Vec<serde_json::Value> = body
        .split_terminator("\n\n")
        .map(|frame| serde_json::from_str(frame.strip_prefix("data: ").unwrap()).unwrap())
        .collect();
    let types: Vec<&str> = frames.iter().map(|f| f["event"]["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec!["turn.started", "step.started", "assistant.delta", "assistant.delta", "turn.completed"]
    );
    assert_eq!(frames[4]["event"]["finalText"], "ab");
    assert_eq!(frames[0]["seq"], 1);
    assert_eq!(frames[0]["sessionId"], "s1");
}

#[test]
fn sse_event_frame_wraps_the_envelope() {
    let hub = turnkit::runtime::EventHub::new("s1", 10);
    let envelope = hub.publish(turnkit::events::RuntimeEvent {
        session_id: "s1".into(),
        turn_id: "t1".into(),
        request_id: "r1".into(),
        timestamp: chrono::Utc::now(),
        kind: turnkit::events::RuntimeEventKind::TurnFailed {
            error: "boom".into(),
        },
    });
    let data = frame_data(&SseEvent { data: envelope });
    assert_eq!(data["seq"], 1);
    assert_eq!(data["event"]["type"], "turn.failed");
    assert_eq!(data["event"]["error"], "boom");
}
