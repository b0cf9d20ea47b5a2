//! Conversation state owned by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{SessionId, StepId, TurnId};
use crate::models::ReasoningConfig;
use crate::types::ModelMessage;

/// Progress of a turn, step, or tool invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Error,
}

/// One tool call within a step. Closes exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: String,
    pub name: String,
    pub status: RunStatus,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: StepId,
    pub title: String,
    pub status: RunStatus,
    pub reasoning: String,
    pub assistant_text: String,
    pub tools: Vec<ToolInvocation>,
}

impl Step {
    pub const DEFAULT_TITLE: &'static str = "Reason -> Tools -> Answer";

    pub fn first_of(turn_id: &str) -> Self {
        Self {
            id: format!("{turn_id}:step:1"),
            title: Self::DEFAULT_TITLE.to_string(),
            status: RunStatus::Running,
            reasoning: String::new(),
            assistant_text: String::new(),
            tools: Vec::new(),
        }
    }

    /// The invocation a result belongs to: by id, else the latest one still running.
    pub fn tool_for_result(&mut self, tool_call_id: Option<&str>) -> Option<&mut ToolInvocation> {
        let by_id = tool_call_id.and_then(|id| self.tools.iter().position(|t| t.tool_call_id == id));
        let index = by_id.or_else(|| {
            self.tools
                .iter()
                .rposition(|t| t.status == RunStatus::Running)
        })?;
        self.tools.get_mut(index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: TurnId,
    pub request_id: String,
    pub input: String,
    pub model_id: String,
    pub reasoning: Option<ReasoningConfig>,
    pub final_text: String,
    pub status: RunStatus,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    /// Close the turn and its still-running steps. No-op once closed.
    pub fn finish(&mut self, status: RunStatus, error: Option<String>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = status;
        self.error = error;
        self.completed_at = Some(Utc::now());
        for step in self.steps.iter_mut().filter(|s| s.status == RunStatus::Running) {
            step.status = status;
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every save to the session store.
    #[serde(default)]
    pub revision: u64,
    /// Seq of the last envelope published for this session.
    #[serde(default)]
    pub last_seq: u64,
}

impl Session {
    pub fn new(id: impl Into<SessionId>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
            last_seq: 0,
        }
    }

    pub fn turn_mut(&mut self, turn_id: &str) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == turn_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Conversation so far as model input: each earlier turn's user input,
    /// then its answer when there is one.
    pub fn history(&self) -> Vec<ModelMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() * 2);
        for turn in &self.turns {
            messages.push(ModelMessage::user(turn.input.clone()));
            if !turn.final_text.trim().is_empty() {
                messages.push(ModelMessage::assistant(turn.final_text.clone()));
            }
        }
        messages
    }
}
