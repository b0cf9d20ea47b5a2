//! Engine-level events crossing the transport boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tool call surfaced by the engine once its fragments are complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// The outcome of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResultEvent {
    /// Correlates with [`ToolCallEvent::id`]; `None` when the producer could not tell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_ok() -> bool {
    true
}

/// Payload of an [`AgentEvent`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum AgentEventKind {
    /// Reasoning fragment.
    Thinking(String),
    /// Answer fragment.
    Message(String),
    ToolCall(ToolCallEvent),
    ToolResult(ToolResultEvent),
    Error(String),
    Status(String),
}

/// A timestamped engine event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentEvent {
    #[serde(flatten)]
    pub kind: AgentEventKind,
    pub timestamp: DateTime<Utc>,
}

impl AgentEvent {
    pub fn new(kind: AgentEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        Self::new(AgentEventKind::Thinking(text.into()))
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new(AgentEventKind::Message(text.into()))
    }

    pub fn tool_call(event: ToolCallEvent) -> Self {
        Self::new(AgentEventKind::ToolCall(event))
    }

    pub fn tool_result(event: ToolResultEvent) -> Self {
        Self::new(AgentEventKind::ToolResult(event))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AgentEventKind::Error(message.into()))
    }

    pub fn status(text: impl Into<String>) -> Self {
        Self::new(AgentEventKind::Status(text.into()))
    }

    /// Stable wire name of the event kind.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            AgentEventKind::Thinking(_) => "thinking",
            AgentEventKind::Message(_) => "message",
            AgentEventKind::ToolCall(_) => "tool_call",
            AgentEventKind::ToolResult(_) => "tool_result",
            AgentEventKind::Error(_) => "error",
            AgentEventKind::Status(_) => "status",
        }
    }
}
