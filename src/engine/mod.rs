//! Stream classifier: turns an agent's raw output into transport events.
//!
//! Chunks of one assistant message are merged until the message is complete
//! (a finish reason, a tool result, or the end of the stream). Reasoning and
//! answer text go out as they arrive; tool calls go out once their fragments
//! are whole. History only ever receives complete messages.

use std::sync::Arc;

use futures::StreamExt;

use crate::agent_loop::AgentGraph;
use crate::error::Result;
use crate::events::{AgentEvent, ToolCallEvent, ToolResultEvent};
use crate::transport::Transport;
use crate::types::{ChunkContent, ContentBlock, GraphMessage, MessageChunk, ModelMessage, ToolMessage};

/// A classified piece of assistant output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Reasoning(String),
    Text(String),
}

/// Split a chunk into reasoning and answer fragments, in order.
///
/// Plain string content is answer text. Unrecognized blocks and empty text
/// are dropped.
pub fn classify(chunk: &MessageChunk) -> Vec<Fragment> {
    match &chunk.content {
        ChunkContent::Text(text) if text.is_empty() => Vec::new(),
        ChunkContent::Text(text) => vec![Fragment::Text(text.clone())],
        ChunkContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Reasoning { reasoning } if !reasoning.is_empty() => {
                    Some(Fragment::Reasoning(reasoning.clone()))
                }
                ContentBlock::Text { text } if !text.is_empty() => Some(Fragment::Text(text.clone())),
                _ => None,
            })
            .collect(),
    }
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutcome {
    /// Concatenated answer text.
    pub final_text: String,
    /// Input history plus every completed assistant and tool message.
    pub history: Vec<ModelMessage>,
}

/// Drives an [`AgentGraph`] and reports through a [`Transport`].
#[derive(Clone)]
pub struct Engine {
    graph: Arc<dyn AgentGraph>,
}

impl Engine {
    pub fn new(graph: Arc<dyn AgentGraph>) -> Self {
        Self { graph }
    }

    /// Run one turn over `history`.
    ///
    /// On failure exactly one error event is emitted (a failure to emit it
    /// is ignored) and the original error is returned.
    pub async fn run(
        &self,
        history: Vec<ModelMessage>,
        transport: Arc<dyn Transport>,
    ) -> Result<EngineOutcome> {
        match self.drive(history, &transport).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if let Err(emit_err) = transport.emit(AgentEvent::error(err.to_string())).await {
                    tracing::warn!(error = %emit_err, "failed to report engine error");
                }
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        history: Vec<ModelMessage>,
        transport: &Arc<dyn Transport>,
    ) -> Result<EngineOutcome> {
        let mut run = RunState {
            history,
            pending: None,
            final_text: String::new(),
            last_assistant_text: String::new(),
        };
        let mut stream = self.graph.stream(run.history.clone(), transport.clone());

        while let Some(item) = stream.next().await {
            match item? {
                GraphMessage::Chunk(chunk) => run.on_chunk(chunk, transport.as_ref()).await?,
                GraphMessage::Tool(message) => run.on_tool(message, transport.as_ref()).await?,
            }
        }
        run.flush(transport.as_ref()).await?;

        let final_text = if run.final_text.is_empty() {
            run.last_assistant_text
        } else {
            run.final_text
        };
        tracing::debug!(messages = run.history.len(), "engine run finished");
        Ok(EngineOutcome {
            final_text,
            history: run.history,
        })
    }
}

struct RunState {
    history: Vec<ModelMessage>,
    pending: Option<MessageChunk>,
    final_text: String,
    last_assistant_text: String,
}

impl RunState {
    async fn on_chunk(&mut self, chunk: MessageChunk, transport: &dyn Transport) -> Result<()> {
        for fragment in classify(&chunk) {
            match fragment {
                Fragment::Reasoning(text) => transport.emit(AgentEvent::thinking(text)).await?,
                Fragment::Text(text) => {
                    self.final_text.push_str(&text);
                    transport.emit(AgentEvent::message(text)).await?;
                }
            }
        }

        let complete = chunk.finish_reason.is_some();
        self.pending = Some(match self.pending.take() {
            Some(acc) => acc.concat(chunk),
            None => chunk,
        });
        if complete {
            self.flush(transport).await?;
        }
        Ok(())
    }

    async fn on_tool(&mut self, message: ToolMessage, transport: &dyn Transport) -> Result<()> {
        self.flush(transport).await?;

        let (output, error) = if message.is_error {
            (serde_json::Value::Null, Some(error_text(&message.content)))
        } else {
            (message.content.clone(), None)
        };
        transport
            .emit(AgentEvent::tool_result(ToolResultEvent {
                tool_call_id: Some(message.tool_call_id.clone()),
                tool_name: Some(message.name.clone()),
                ok: !message.is_error,
                output,
                error,
            }))
            .await?;
        self.history.push(message.into_message());
        Ok(())
    }

    /// Close the pending assistant message, surfacing its tool calls.
    async fn flush(&mut self, transport: &dyn Transport) -> Result<()> {
        let Some(message) = self.pending.take() else {
            return Ok(());
        };
        let calls = message.tool_calls();
        for call in &calls {
            transport
                .emit(AgentEvent::tool_call(ToolCallEvent {
                    id: Some(call.id.clone()),
                    name: Some(call.name.clone()),
                    args: call.arguments.clone(),
                }))
                .await?;
        }
        let text = message.text_content();
        if !text.is_empty() {
            self.last_assistant_text = text.clone();
        }
        self.history.push(ModelMessage::assistant_with_tool_calls(text, calls));
        Ok(())
    }
}

fn error_text(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => match map.get("error") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => content.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::agent_loop::GraphStream;
    use crate::error::TurnkitError;
    use crate::events::AgentEventKind;
    use crate::types::{FinishReason, Role, ToolCallChunk};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<AgentEventKind>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn emit(&self, event: AgentEvent) -> Result<()> {
            self.events.lock().push(event.kind);
            Ok(())
        }

        async fn request_input(&self) -> Result<String> {
            Err(TurnkitError::InputClosed)
        }
    }

    struct Scripted(Mutex<Option<Vec<Result<GraphMessage>>>>);

    impl Scripted {
        fn new(items: Vec<Result<GraphMessage>>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(Some(items))))
        }
    }

    impl AgentGraph for Scripted {
        fn stream(&self, _history: Vec<ModelMessage>, _transport: Arc<dyn Transport>) -> GraphStream {
            let items = self.0.lock().take().unwrap_or_default();
            futures::stream::iter(items).boxed()
        }
    }

    async fn run(items: Vec<Result<GraphMessage>>) -> (Result<EngineOutcome>, Vec<AgentEventKind>) {
        let recorder = Arc::new(Recorder::default());
        let engine = Engine::new(Scripted::new(items));
        let outcome = engine
            .run(vec![ModelMessage::user("hi")], recorder.clone())
            .await;
        let events = recorder.events.lock().clone();
        (outcome, events)
    }

    fn chunk(text: &str) -> Result<GraphMessage> {
        Ok(GraphMessage::Chunk(MessageChunk::text(text)))
    }

    #[tokio::test]
    async fn text_deltas_concatenate_into_final_text() {
        let (outcome, events) = run(vec![chunk("Hello"), chunk(" world")]).await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.final_text, "Hello world");
        assert_eq!(
            events,
            vec![
                AgentEventKind::Message("Hello".into()),
                AgentEventKind::Message(" world".into()),
            ]
        );
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.history[1].role, Role::Assistant);
        assert_eq!(outcome.history[1].text_content(), "Hello world");
    }

    #[tokio::test]
    async fn reasoning_is_emitted_but_never_in_final_text() {
        let blocks = MessageChunk::blocks(vec![
            ContentBlock::Reasoning {
                reasoning: "thinking it over".into(),
            },
            ContentBlock::Text { text: "42".into() },
            ContentBlock::Unknown,
        ]);
        let (outcome, events) = run(vec![Ok(GraphMessage::Chunk(blocks))]).await;
        assert_eq!(outcome.unwrap().final_text, "42");
        assert_eq!(
            events,
            vec![
                AgentEventKind::Thinking("thinking it over".into()),
                AgentEventKind::Message("42".into()),
            ]
        );
    }

    #[tokio::test]
    async fn tool_calls_surface_on_finish_and_results_follow() {
        let call = MessageChunk::text("")
            .with_tool_call_chunk(ToolCallChunk {
                index: 0,
                id: Some("call_1".into()),
                name: Some("ask_human".into()),
                arguments: Some("{\"question\":".into()),
            });
        let rest = MessageChunk::text("")
            .with_tool_call_chunk(ToolCallChunk {
                index: 0,
                id: None,
                name: None,
                arguments: Some("\"Which?\"}".into()),
            })
            .with_finish_reason(FinishReason::ToolCalls);
        let result = ToolMessage {
            tool_call_id: "call_1".into(),
            name: "ask_human".into(),
            content: json!("the blue one"),
            is_error: false,
        };

        let (outcome, events) = run(vec![
            Ok(GraphMessage::Chunk(call)),
            Ok(GraphMessage::Chunk(rest)),
            Ok(GraphMessage::Tool(result)),
            chunk("Got it."),
        ])
        .await;

        assert_eq!(
            events,
            vec![
                AgentEventKind::ToolCall(ToolCallEvent {
                    id: Some("call_1".into()),
                    name: Some("ask_human".into()),
                    args: json!({ "question": "Which?" }),
                }),
                AgentEventKind::ToolResult(ToolResultEvent {
                    tool_call_id: Some("call_1".into()),
                    tool_name: Some("ask_human".into()),
                    ok: true,
                    output: json!("the blue one"),
                    error: None,
                }),
                AgentEventKind::Message("Got it.".into()),
            ]
        );
        let outcome = outcome.unwrap();
        let roles: Vec<Role> = outcome.history.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        assert_eq!(outcome.history[1].tool_calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_tool_result_carries_error() {
        let result = ToolMessage {
            tool_call_id: "call_9".into(),
            name: "lookup".into(),
            content: json!({ "error": "not found" }),
            is_error: true,
        };
        let (_, events) = run(vec![Ok(GraphMessage::Tool(result))]).await;
        let AgentEventKind::ToolResult(event) = &events[0] else {
            panic!("expected tool result, got {events:?}");
        };
        assert!(!event.ok);
        assert_eq!(event.error.as_deref(), Some("not found"));
    }

    #[tokio::test]
    async fn stream_error_emits_exactly_one_error_event() {
        let (outcome, events) = run(vec![
            chunk("partial"),
            Err(TurnkitError::Stream("connection reset".into())),
        ])
        .await;
        let err = outcome.unwrap_err();
        assert!(matches!(err, TurnkitError::Stream(_)));
        let errors: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, AgentEventKind::Error(_)))
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0],
            &AgentEventKind::Error("Stream error: connection reset".into())
        );
    }

    #[tokio::test]
    async fn empty_stream_yields_empty_text() {
        let (outcome, events) = run(Vec::new()).await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.final_text, "");
        assert!(events.is_empty());
        assert_eq!(outcome.history.len(), 1);
    }

    #[test]
    fn classify_drops_empty_text() {
        assert!(classify(&MessageChunk::text("")).is_empty());
    }
}
