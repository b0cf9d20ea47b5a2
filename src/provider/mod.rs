//! Model providers: one streamed chat call per [`ChatModel::stream_chat`].

pub mod http;

#[cfg(feature = "openai")]
pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::models::ReasoningConfig;
use crate::tools::ToolDefinition;
use crate::types::{MessageChunk, ModelMessage};

#[cfg(feature = "openai")]
pub use openai::OpenAiChatModel;

/// A request for one model call.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<ToolDefinition>,
    pub reasoning: Option<ReasoningConfig>,
}

/// Stream of partial assistant output.
pub type ChunkStream = BoxStream<'static, Result<MessageChunk>>;

/// A chat model that streams its reply as [`MessageChunk`]s.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name (e.g. "openai").
    fn provider_name(&self) -> &str;

    fn model_id(&self) -> &str;

    async fn stream_chat(&self, request: ChatRequest) -> Result<ChunkStream>;
}
