//! Observer-facing lifecycle events and their sequenced envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RequestId, SessionId, StepId, TurnId};
use crate::models::ReasoningConfig;

/// Human-in-the-loop status transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HumanInputStatus {
    #[serde(rename = "human_input.requested")]
    Requested,
    #[serde(rename = "human_input.received")]
    Received,
}

/// Lifecycle payload, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum RuntimeEventKind {
    #[serde(rename = "turn.started")]
    TurnStarted {
        input: String,
        model_id: String,
        reasoning: Option<ReasoningConfig>,
    },
    #[serde(rename = "step.started")]
    StepStarted { step_id: StepId, title: String },
    #[serde(rename = "reasoning.delta")]
    ReasoningDelta { step_id: StepId, text: String },
    #[serde(rename = "assistant.delta")]
    AssistantDelta { step_id: StepId, text: String },
    #[serde(rename = "tool.started")]
    ToolStarted {
        step_id: StepId,
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(rename = "tool.completed")]
    ToolCompleted {
        step_id: StepId,
        tool_call_id: String,
        tool_name: String,
        ok: bool,
        #[serde(default)]
        output: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename = "status")]
    Status { status: HumanInputStatus },
    #[serde(rename = "turn.completed")]
    TurnCompleted { final_text: String },
    #[serde(rename = "turn.failed")]
    TurnFailed { error: String },
}

impl RuntimeEventKind {
    /// Wire name, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnStarted { .. } => "turn.started",
            Self::StepStarted { .. } => "step.started",
            Self::ReasoningDelta { .. } => "reasoning.delta",
            Self::AssistantDelta { .. } => "assistant.delta",
            Self::ToolStarted { .. } => "tool.started",
            Self::ToolCompleted { .. } => "tool.completed",
            Self::Status { .. } => "status",
            Self::TurnCompleted { .. } => "turn.completed",
            Self::TurnFailed { .. } => "turn.failed",
        }
    }

    /// Whether this event ends a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TurnCompleted { .. } | Self::TurnFailed { .. })
    }
}

/// A lifecycle event with its correlation ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEvent {
    pub session_id: SessionId,
    pub turn_id: TurnId,
    pub request_id: RequestId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: RuntimeEventKind,
}

/// The unit delivered to observers. Immutable once published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamEnvelope {
    pub id: Uuid,
    pub session_id: SessionId,
    /// Per-session sequence number, starting at 1, gapless.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event: RuntimeEvent,
}

/// Server-push frame shape: `{ "data": envelope }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SseEvent {
    pub data: StreamEnvelope,
}

impl SseEvent {
    /// Encode as a `text/event-stream` frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(&self.data)?))
    }
}
