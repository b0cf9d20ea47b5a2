//! The transport a running turn reports through: folds engine events into
//! session state and lifecycle envelopes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::logs::LogScope;
use super::orchestrator::SessionRuntime;
use super::session::{RunStatus, ToolInvocation};
use crate::error::Result;
use crate::events::{
    AgentEvent, AgentEventKind, HumanInputStatus, RequestId, RuntimeEventKind, StepId,
    ToolCallEvent, ToolResultEvent, TurnId,
};
use crate::transport::Transport;

/// Ids that tie an event to its turn and step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnContext {
    pub turn_id: TurnId,
    pub request_id: RequestId,
    pub step_id: StepId,
}

impl TurnContext {
    pub fn scope(&self) -> LogScope {
        LogScope::turn(self.turn_id.clone(), self.request_id.clone())
    }
}

pub(crate) struct TurnTransport {
    runtime: Arc<SessionRuntime>,
    ctx: TurnContext,
}

impl TurnTransport {
    pub(crate) fn new(runtime: Arc<SessionRuntime>, ctx: TurnContext) -> Self {
        Self { runtime, ctx }
    }

    fn on_thinking(&self, text: String) {
        self.runtime.with_turn(&self.ctx, |turn| {
            if let Some(step) = turn.step_mut(&self.ctx.step_id) {
                step.reasoning.push_str(&text);
            }
        });
        self.runtime.publish(
            &self.ctx,
            RuntimeEventKind::ReasoningDelta {
                step_id: self.ctx.step_id.clone(),
                text,
            },
        );
    }

    fn on_message(&self, text: String) {
        self.runtime.with_turn(&self.ctx, |turn| {
            turn.final_text.push_str(&text);
            if let Some(step) = turn.step_mut(&self.ctx.step_id) {
                step.assistant_text.push_str(&text);
            }
        });
        self.runtime.publish(
            &self.ctx,
            RuntimeEventKind::AssistantDelta {
                step_id: self.ctx.step_id.clone(),
                text,
            },
        );
    }

    fn on_tool_call(&self, call: ToolCallEvent) {
        let tool_call_id = call.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let tool_name = call.name.unwrap_or_else(|| "tool".to_string());
        self.runtime.with_turn(&self.ctx, |turn| {
            if let Some(step) = turn.step_mut(&self.ctx.step_id) {
                step.tools.push(ToolInvocation {
                    tool_call_id: tool_call_id.clone(),
                    name: tool_name.clone(),
                    status: RunStatus::Running,
                    input: call.args.clone(),
                    output: None,
                    error: None,
                });
            }
        });
        self.runtime.publish(
            &self.ctx,
            RuntimeEventKind::ToolStarted {
                step_id: self.ctx.step_id.clone(),
                tool_call_id,
                tool_name,
                input: call.args,
            },
        );
    }

    fn on_tool_result(&self, result: ToolResultEvent) {
        let status = if result.ok {
            RunStatus::Completed
        } else {
            RunStatus::Error
        };
        let matched = self
            .runtime
            .with_turn(&self.ctx, |turn| {
                let step = turn.step_mut(&self.ctx.step_id)?;
                let tool = step.tool_for_result(result.tool_call_id.as_deref())?;
                tool.status = status;
                tool.output = Some(result.output.clone());
                tool.error = result.error.clone();
                Some((tool.tool_call_id.clone(), tool.name.clone()))
            })
            .flatten();

        let (tool_call_id, tool_name) = match matched {
            Some(ids) => ids,
            None => (
                result
                    .tool_call_id
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                result.tool_name.unwrap_or_else(|| "tool".to_string()),
            ),
        };
        self.runtime.publish(
            &self.ctx,
            RuntimeEventKind::ToolCompleted {
                step_id: self.ctx.step_id.clone(),
                tool_call_id,
                tool_name,
                ok: result.ok,
                output: result.output,
                error: result.error,
            },
        );
    }

    fn on_error(&self, message: String) {
        self.runtime.with_turn(&self.ctx, |turn| {
            turn.finish(RunStatus::Error, Some(message.clone()));
        });
        self.runtime
            .logs()
            .error("core.error", &self.ctx.scope(), json!({ "message": message }));
    }
}

#[async_trait]
impl Transport for TurnTransport {
    async fn emit(&self, event: AgentEvent) -> Result<()> {
        match event.kind {
            AgentEventKind::Thinking(text) => self.on_thinking(text),
            AgentEventKind::Message(text) => self.on_message(text),
            AgentEventKind::ToolCall(call) => self.on_tool_call(call),
            AgentEventKind::ToolResult(result) => self.on_tool_result(result),
            AgentEventKind::Error(message) => self.on_error(message),
            AgentEventKind::Status(status) => {
                tracing::debug!(turn_id = %self.ctx.turn_id, status = %status, "core status");
            }
        }
        Ok(())
    }

    async fn request_input(&self) -> Result<String> {
        let request = self.runtime.input().arm()?;
        self.runtime.publish(
            &self.ctx,
            RuntimeEventKind::Status {
                status: HumanInputStatus::Requested,
            },
        );
        self.runtime
            .logs()
            .info("human_input.requested", &self.ctx.scope(), json!({}));
        request.recv().await
    }
}
