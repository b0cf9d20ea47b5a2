//! Shared test helpers: scripted models, graphs and factories.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;

use turnkit::agent_loop::{AgentFactory, AgentGraph, GraphStream, ToolLoop};
use turnkit::error::{Result, TurnkitError};
use turnkit::events::{RuntimeEventKind, SseEvent, StreamEnvelope};
use turnkit::models::ResolvedModel;
use turnkit::provider::{ChatModel, ChatRequest, ChunkStream};
use turnkit::runtime::Subscription;
use turnkit::tools::{AskHumanTool, ToolRegistry};
use turnkit::transport::Transport;
use turnkit::types::{FinishReason, GraphMessage, MessageChunk, ModelMessage, ToolCallChunk};

/// A chat model that replays queued responses, one per `stream_chat` call.
#[derive(Default)]
pub struct ScriptedChatModel {
    responses: Mutex<VecDeque<Vec<MessageChunk>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain answer streamed as the given deltas.
    pub fn queue_text(&self, deltas: &[&str]) -> &Self {
        let mut chunks: Vec<MessageChunk> = deltas.iter().map(|d| MessageChunk::text(*d)).collect();
        chunks.push(MessageChunk::text("").with_finish_reason(FinishReason::Stop));
        self.responses.lock().push_back(chunks);
        self
    }

    /// Queue a single tool call, split over two argument fragments.
    pub fn queue_tool_call(&self, id: &str, name: &str, arguments: &str) -> &Self {
        let (head, tail) = arguments.split_at(arguments.len() / 2);
        let chunks = vec![
            MessageChunk::text("").with_tool_call_chunk(ToolCallChunk {
                index: 0,
                id: Some(id.to_string()),
                name: Some(name.to_string()),
                arguments: Some(head.to_string()),
            }),
            MessageChunk::text("")
                .with_tool_call_chunk(ToolCallChunk {
                    index: 0,
                    arguments: Some(tail.to_string()),
                    ..Default::default()
                })
                .with_finish_reason(FinishReason::ToolCalls),
        ];
        self.responses.lock().push_back(chunks);
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<ChunkStream> {
        self.requests.lock().push(request);
        let chunks = self
            .responses
            .lock()
            .pop_front()
            .ok_or_else(|| TurnkitError::Stream("no scripted response left".into()))?;
        Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}

/// A tool loop over `model` with the human-input tool registered.
pub fn ask_human_loop(model: Arc<ScriptedChatModel>) -> Arc<dyn AgentGraph> {
    let tools = ToolRegistry::new().with(Arc::new(AskHumanTool::new()));
    Arc::new(ToolLoop::new(model, tools))
}

/// What a [`ScriptedGraph`] does each time it is streamed.
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream these text deltas and finish.
    Text(Vec<&'static str>),
    /// Wait, then answer with one delta.
    Slow { delay_ms: u64, text: &'static str },
    /// Stream one delta, then fail with a stream error.
    Fail(&'static str),
    /// Never produce anything.
    Hang,
}

/// A graph that plays the same script on every turn.
pub struct ScriptedGraph {
    script: Script,
    histories: Mutex<Vec<Vec<ModelMessage>>>,
}

impl ScriptedGraph {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            histories: Mutex::new(Vec::new()),
        })
    }

    /// Histories received, one per turn.
    pub fn histories(&self) -> Vec<Vec<ModelMessage>> {
        self.histories.lock().clone()
    }
}

impl AgentGraph for ScriptedGraph {
    fn stream(&self, history: Vec<ModelMessage>, _transport: Arc<dyn Transport>) -> GraphStream {
        self.histories.lock().push(history);
        let script = self.script.clone();
        Box::pin(async_stream::try_stream! {
            match script {
                Script::Text(deltas) => {
                    for delta in deltas {
                        yield GraphMessage::Chunk(MessageChunk::text(delta));
                    }
                    yield GraphMessage::Chunk(MessageChunk::text("").with_finish_reason(FinishReason::Stop));
                }
                Script::Slow { delay_ms, text } => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    yield GraphMessage::Chunk(MessageChunk::text(text).with_finish_reason(FinishReason::Stop));
                }
                Script::Fail(message) => {
                    yield GraphMessage::Chunk(MessageChunk::text("partial"));
                    Err(TurnkitError::Stream(message.to_string()))?;
                }
                Script::Hang => {
                    futures::future::pending::<()>().await;
                }
            }
        })
    }
}

/// Hands out one graph for every model.
pub struct StaticFactory {
    graph: Arc<dyn AgentGraph>,
    resolved: Mutex<Vec<ResolvedModel>>,
}

impl StaticFactory {
    pub fn new(graph: Arc<dyn AgentGraph>) -> Arc<Self> {
        Arc::new(Self {
            graph,
            resolved: Mutex::new(Vec::new()),
        })
    }

    /// Models resolved so far, in turn order.
    pub fn resolved(&self) -> Vec<ResolvedModel> {
        self.resolved.lock().clone()
    }
}

impl AgentFactory for StaticFactory {
    fn graph_for(&self, model: &ResolvedModel) -> Result<Arc<dyn AgentGraph>> {
        self.resolved.lock().push(model.clone());
        Ok(self.graph.clone())
    }
}

/// Read envelopes until a turn ends; returns everything read.
pub async fn until_terminal(subscription: &mut Subscription) -> Vec<StreamEnvelope> {
    let mut seen = Vec::new();
    while let Some(envelope) = subscription.recv().await {
        let done = envelope.event.kind.is_terminal();
        seen.push(envelope);
        if done {
            break;
        }
    }
    seen
}

/// Read envelopes until `count` turns have ended.
pub async fn until_terminals(subscription: &mut Subscription, count: usize) -> Vec<StreamEnvelope> {
    let mut seen = Vec::new();
    for _ in 0..count {
        seen.extend(until_terminal(subscription).await);
    }
    seen
}

/// Read envelopes until one matches `pred`.
pub async fn until(
    subscription: &mut Subscription,
    pred: impl Fn(&RuntimeEventKind) -> bool,
) -> Vec<StreamEnvelope> {
    let mut seen = Vec::new();
    while let Some(envelope) = subscription.recv().await {
        let hit = pred(&envelope.event.kind);
        seen.push(envelope);
        if hit {
            break;
        }
    }
    seen
}

pub fn kinds(envelopes: &[StreamEnvelope]) -> Vec<&'static str> {
    envelopes.iter().map(|e| e.event.kind.name()).collect()
}

pub fn frame_data(event: &SseEvent) -> serde_json::Value {
    let frame = event.to_frame().unwrap();
    serde_json::from_str(frame.trim_start_matches("data: ").trim_end()).unwrap()
}
