//! OpenAI Chat Completions streaming provider.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::config::DEFAULT_OPENAI_BASE_URL;
use crate::error::{Result, TurnkitError};
use crate::models::ReasoningEffort;
use crate::types::{
    ContentBlock, ContentPart, FinishReason, MessageChunk, ModelMessage, Role, ToolCallChunk,
};

use super::http::{bearer_headers, parse_sse_data, shared_client, status_to_error};
use super::{ChatModel, ChatRequest, ChunkStream};

pub struct OpenAiChatModel {
    model_id: String,
    api_key: String,
    base_url: String,
}

impl OpenAiChatModel {
    pub fn new(model_id: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            model_id: model_id.into(),
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request.messages.iter().map(message_to_openai).collect();

        let mut body = serde_json::Map::new();
        body.insert("model".into(), self.model_id.clone().into());
        body.insert("messages".into(), messages.into());
        body.insert("stream".into(), true.into());

        if !request.tools.is_empty() {
            let tools: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body.insert("tools".into(), tools.into());
        }

        if let Some(reasoning) = request.reasoning {
            if reasoning.effort != ReasoningEffort::None {
                body.insert("reasoning_effort".into(), reasoning.effort.to_string().into());
            }
        }

        serde_json::Value::Object(body)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<ChunkStream> {
        let body = self.build_request_body(&request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %self.model_id,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "openai stream_chat"
        );

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = String::new();
            futures::pin_mut!(byte_stream);

            while let Some(next) = byte_stream.next().await {
                let bytes = match next {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(TurnkitError::Network(e));
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(line_end) = buffer.find('\n') {
                    let line: String = buffer.drain(..=line_end).collect();
                    let line = line.trim();
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }
                    let Some(data) = parse_sse_data(line) else {
                        continue;
                    };
                    match serde_json::from_str::<OpenAiStreamChunk>(data) {
                        Ok(OpenAiStreamChunk { error: Some(error), .. }) => {
                            yield Err(TurnkitError::Stream(stream_error_message(&error)));
                            return;
                        }
                        Ok(chunk) => {
                            if let Some(chunk) = chunk.into_message_chunk() {
                                yield Ok(chunk);
                            }
                        }
                        Err(err) => {
                            debug!(error = %err, "skipping unparseable openai chunk");
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

/// Text of an in-band `{"error": {...}}` payload sent mid-stream.
fn stream_error_message(error: &serde_json::Value) -> String {
    error
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

fn message_to_openai(msg: &ModelMessage) -> serde_json::Value {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    if let Some(ContentPart::ToolResult(result)) = msg.content.first() {
        let content = match &result.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return serde_json::json!({
            "role": "tool",
            "tool_call_id": result.tool_call_id,
            "content": content,
        });
    }

    let text = msg.text_content();
    let tool_calls = msg.tool_calls();
    if tool_calls.is_empty() {
        return serde_json::json!({ "role": role, "content": text });
    }

    let calls: Vec<serde_json::Value> = tool_calls
        .iter()
        .map(|tc| {
            serde_json::json!({
                "id": tc.id,
                "type": "function",
                "function": {
                    "name": tc.name,
                    "arguments": tc.arguments.to_string(),
                }
            })
        })
        .collect();
    serde_json::json!({
        "role": role,
        "content": if text.is_empty() { serde_json::Value::Null } else { serde_json::Value::String(text) },
        "tool_calls": calls,
    })
}

// OpenAI wire types (internal)

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiStreamDelta {
    content: Option<String>,
    /// Reasoning text, as sent by compatible servers that expose it.
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCallDelta>,
}

#[derive(Deserialize)]
struct OpenAiToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<OpenAiFunctionDelta>,
}

#[derive(Deserialize)]
struct OpenAiFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

impl OpenAiStreamChunk {
    fn into_message_chunk(self) -> Option<MessageChunk> {
        let choice = self.choices.into_iter().next()?;
        let delta = choice.delta;
        let text = delta.content.unwrap_or_default();

        let mut chunk = match delta.reasoning_content.filter(|r| !r.is_empty()) {
            Some(reasoning) => {
                let mut blocks = vec![ContentBlock::Reasoning { reasoning }];
                if !text.is_empty() {
                    blocks.push(ContentBlock::Text { text });
                }
                MessageChunk::blocks(blocks)
            }
            None => MessageChunk::text(text),
        };
        for call in delta.tool_calls {
            let (name, arguments) = match call.function {
                Some(f) => (f.name, f.arguments),
                None => (None, None),
            };
            chunk = chunk.with_tool_call_chunk(ToolCallChunk {
                index: call.index,
                id: call.id,
                name,
                arguments,
            });
        }
        if let Some(reason) = choice.finish_reason.as_deref().and_then(parse_finish_reason) {
            chunk = chunk.with_finish_reason(reason);
        }
        Some(chunk)
    }
}
