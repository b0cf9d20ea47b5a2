//! Streaming types: the content chunks an agent graph yields while a turn runs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::{AgentToolCall, ModelMessage};

/// Why a model message finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
}

/// One tagged block inside a structured chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Reasoning { reasoning: String },
    Text { text: String },
    /// Any block kind the classifier does not surface (images, citations, ...).
    #[serde(other)]
    Unknown,
}

/// Chunk payload: either plain text or a list of tagged blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChunkContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for ChunkContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl ChunkContent {
    fn into_blocks(self) -> Vec<ContentBlock> {
        match self {
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => vec![ContentBlock::Text { text }],
            Self::Blocks(blocks) => blocks,
        }
    }
}

/// Partial tool call. Fragments sharing an `index` belong to the same call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolCallChunk {
    #[serde(default)]
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallChunk {
    fn absorb(&mut self, other: ToolCallChunk) {
        if self.id.is_none() {
            self.id = other.id;
        }
        append_opt(&mut self.name, other.name);
        append_opt(&mut self.arguments, other.arguments);
    }

    /// Decode the accumulated fragment into a complete tool call.
    ///
    /// Empty arguments decode to `{}`; arguments that are not valid JSON are
    /// kept verbatim as a string.
    pub fn to_tool_call(&self) -> AgentToolCall {
        let raw = self.arguments.as_deref().unwrap_or("").trim();
        let arguments = if raw.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
        };
        AgentToolCall {
            id: self
                .id
                .clone()
                .unwrap_or_else(|| format!("call_{}", self.index)),
            name: self.name.clone().unwrap_or_else(|| "tool".to_string()),
            arguments,
        }
    }
}

fn append_opt(target: &mut Option<String>, extra: Option<String>) {
    match (target.as_mut(), extra) {
        (Some(existing), Some(extra)) => existing.push_str(&extra),
        (None, Some(extra)) => *target = Some(extra),
        _ => {}
    }
}

/// An incremental fragment of an assistant message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageChunk {
    #[serde(default)]
    pub content: ChunkContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_call_chunks: Vec<ToolCallChunk>,
    /// Set on the last chunk of a message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl MessageChunk {
    /// A plain-text chunk.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: ChunkContent::Text(text.into()),
            ..Default::default()
        }
    }

    /// A chunk made of tagged blocks.
    pub fn blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            content: ChunkContent::Blocks(blocks),
            ..Default::default()
        }
    }

    pub fn with_tool_call_chunk(mut self, chunk: ToolCallChunk) -> Self {
        self.tool_call_chunks.push(chunk);
        self
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    /// Merge a following chunk of the same message into this one.
    ///
    /// Adjacent plain text stays plain; anything structured is kept as an
    /// ordered block list. Tool-call fragments are accumulated by index.
    pub fn concat(self, next: MessageChunk) -> MessageChunk {
        let content = match (self.content, next.content) {
            (ChunkContent::Text(mut a), ChunkContent::Text(b)) => {
                a.push_str(&b);
                ChunkContent::Text(a)
            }
            (a, b) => {
                let mut blocks = a.into_blocks();
                for block in b.into_blocks() {
                    let merged = match (blocks.last_mut(), &block) {
                        (Some(ContentBlock::Text { text }), ContentBlock::Text { text: more }) => {
                            text.push_str(more);
                            true
                        }
                        (
                            Some(ContentBlock::Reasoning { reasoning }),
                            ContentBlock::Reasoning { reasoning: more },
                        ) => {
                            reasoning.push_str(more);
                            true
                        }
                        _ => false,
                    };
                    if !merged {
                        blocks.push(block);
                    }
                }
                ChunkContent::Blocks(blocks)
            }
        };

        let mut tool_call_chunks = self.tool_call_chunks;
        for fragment in next.tool_call_chunks {
            match tool_call_chunks.iter_mut().find(|c| c.index == fragment.index) {
                Some(existing) => existing.absorb(fragment),
                None => tool_call_chunks.push(fragment),
            }
        }

        MessageChunk {
            content,
            tool_call_chunks,
            finish_reason: next.finish_reason.or(self.finish_reason),
        }
    }

    /// Answer text carried by this chunk (reasoning excluded).
    pub fn text_content(&self) -> String {
        match &self.content {
            ChunkContent::Text(text) => text.clone(),
            ChunkContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Fully decoded tool calls accumulated so far, in index order.
    pub fn tool_calls(&self) -> Vec<AgentToolCall> {
        let mut chunks: Vec<&ToolCallChunk> = self.tool_call_chunks.iter().collect();
        chunks.sort_by_key(|c| c.index);
        chunks.into_iter().map(ToolCallChunk::to_tool_call).collect()
    }

    /// Convert the merged chunk into a history entry.
    pub fn into_message(self) -> ModelMessage {
        let text = self.text_content();
        ModelMessage::assistant_with_tool_calls(text, self.tool_calls())
    }
}

/// The terminal message produced by running a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolMessage {
    pub tool_call_id: String,
    pub name: String,
    pub content: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolMessage {
    pub fn into_message(self) -> ModelMessage {
        ModelMessage::tool_result(self.tool_call_id, self.content, self.is_error)
    }
}

/// One item of an agent graph's output stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphMessage {
    Chunk(MessageChunk),
    Tool(ToolMessage),
}
