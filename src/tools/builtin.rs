//! Built-in tools.

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolExecutionContext};
use super::types::AgentToolParameters;
use crate::error::TurnkitError;
use crate::events::AgentEvent;

pub const ASK_HUMAN_TOOL_NAME: &str = "ask_human";

/// Reply used when the tool runs with no transport bound.
pub const NO_TRANSPORT_REPLY: &str = "No transport available to ask human.";

/// Pauses the turn and asks the person on the other end of the transport.
///
/// The question goes out as a message event; the tool result is whatever the
/// person answers.
#[derive(Debug)]
pub struct AskHumanTool {
    parameters: AgentToolParameters,
}

impl AskHumanTool {
    pub fn new() -> Self {
        Self {
            parameters: AgentToolParameters::object()
                .string("question", "The question to put to the human", true)
                .build(),
        }
    }
}

impl Default for AskHumanTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for AskHumanTool {
    fn name(&self) -> &str {
        ASK_HUMAN_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Ask human a question for clarification of tasks."
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, TurnkitError> {
        let question = args.get_str("question")?;
        let Some(transport) = ctx.transport.as_ref() else {
            return Ok(serde_json::Value::String(NO_TRANSPORT_REPLY.to_string()));
        };

        transport.emit(AgentEvent::message(question)).await?;
        tracing::debug!(tool_call_id = ?ctx.tool_call_id, "waiting for human input");
        let answer = transport.request_input().await?;
        Ok(serde_json::Value::String(answer))
    }
}
