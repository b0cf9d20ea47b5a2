//! Model → tools → model cycle over a [`ChatModel`].

use std::sync::Arc;

use futures::StreamExt;

use super::graph::{AgentGraph, GraphStream};
use crate::error::TurnkitError;
use crate::models::ReasoningConfig;
use crate::provider::{ChatModel, ChatRequest};
use crate::tools::{validate_arguments, ToolArguments, ToolExecutionContext, ToolRegistry};
use crate::transport::Transport;
use crate::types::{AgentToolCall, GraphMessage, MessageChunk, ModelMessage, Role, ToolMessage};

/// Calls the model, runs any tools it asks for, and repeats until it answers
/// without tool calls.
///
/// Tool failures are handed back to the model as error results; only model
/// and stream errors end the run.
#[derive(Clone)]
pub struct ToolLoop {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    system_prompt: Option<String>,
    reasoning: Option<ReasoningConfig>,
    max_iterations: usize,
}

impl ToolLoop {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry) -> Self {
        Self {
            model,
            tools,
            system_prompt: None,
            reasoning: None,
            max_iterations: crate::config::DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: Option<ReasoningConfig>) -> Self {
        self.reasoning = reasoning;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

impl AgentGraph for ToolLoop {
    fn stream(&self, history: Vec<ModelMessage>, transport: Arc<dyn Transport>) -> GraphStream {
        let this = self.clone();
        let mut messages = history;
        if let Some(prompt) = &this.system_prompt {
            if messages.first().map(|m| m.role) != Some(Role::System) {
                messages.insert(0, ModelMessage::system(prompt.clone()));
            }
        }

        Box::pin(async_stream::try_stream! {
            let mut finished = false;
            for iteration in 0..this.max_iterations {
                tracing::debug!(iteration, model = this.model.model_id(), "tool loop step");
                let request = ChatRequest {
                    messages: messages.clone(),
                    tools: this.tools.definitions(),
                    reasoning: this.reasoning,
                };
                let mut chunks = this.model.stream_chat(request).await?;

                let mut assembled: Option<MessageChunk> = None;
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk?;
                    assembled = Some(match assembled.take() {
                        Some(acc) => acc.concat(chunk.clone()),
                        None => chunk.clone(),
                    });
                    yield GraphMessage::Chunk(chunk);
                }

                let Some(reply) = assembled else {
                    finished = true;
                    break;
                };
                let calls = reply.tool_calls();
                messages.push(reply.into_message());
                if calls.is_empty() {
                    finished = true;
                    break;
                }

                for call in calls {
                    let result = this.run_tool(&call, &transport).await;
                    messages.push(result.clone().into_message());
                    yield GraphMessage::Tool(result);
                }
            }

            if !finished {
                Err(TurnkitError::Stream(format!(
                    "tool loop exceeded {} iterations",
                    this.max_iterations
                )))?;
            }
        })
    }
}

impl ToolLoop {
    async fn run_tool(&self, call: &AgentToolCall, transport: &Arc<dyn Transport>) -> ToolMessage {
        let outcome = match self.tools.get(&call.name) {
            None => Err(TurnkitError::tool(&call.name, format!("Tool '{}' not found", call.name))),
            Some(tool) => match validate_arguments(&call.arguments, &tool.parameters().schema) {
                Err(err) => Err(err),
                Ok(()) => {
                    let ctx = ToolExecutionContext::new(call.id.clone(), transport.clone());
                    tool.execute(&ToolArguments::new(call.arguments.clone()), &ctx).await
                }
            },
        };

        match outcome {
            Ok(content) => ToolMessage {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                content,
                is_error: false,
            },
            Err(err) => {
                tracing::warn!(tool = %call.name, tool_call_id = %call.id, error = %err, "tool failed");
                ToolMessage {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    content: serde_json::json!({ "error": err.to_string() }),
                    is_error: true,
                }
            }
        }
    }
}
