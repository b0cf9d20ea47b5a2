//! Terminal rendering for engine and session events.

use crate::events::{AgentEvent, AgentEventKind, HumanInputStatus, RuntimeEventKind};

/// Where a rendered fragment belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Answer text, printed as-is.
    Stdout(String),
    /// Everything else.
    Stderr(String),
}

impl Output {
    pub fn write(&self) {
        use std::io::Write;
        match self {
            Self::Stdout(text) => {
                print!("{text}");
                let _ = std::io::stdout().flush();
            }
            Self::Stderr(text) => {
                eprint!("{text}");
            }
        }
    }
}

const MAX_TOOL_OUTPUT: usize = 200;

/// Shorten to at most `max` bytes on a char boundary, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn tool_result_line(ok: bool, output: &serde_json::Value, error: Option<&str>) -> String {
    let text = match (ok, error) {
        (false, Some(error)) => error.to_string(),
        _ => match output {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    };
    let marker = if ok { "✅" } else { "❌" };
    format!("  {marker} {}\n", truncate(&text, MAX_TOOL_OUTPUT))
}

/// Render one session envelope's event.
pub fn runtime_event(kind: &RuntimeEventKind) -> Option<Output> {
    match kind {
        RuntimeEventKind::AssistantDelta { text, .. } => Some(Output::Stdout(text.clone())),
        RuntimeEventKind::ReasoningDelta { text, .. } => Some(Output::Stderr(text.clone())),
        RuntimeEventKind::ToolStarted {
            tool_call_id,
            tool_name,
            ..
        } => Some(Output::Stderr(format!("\n⚡ {tool_name} ({tool_call_id})\n"))),
        RuntimeEventKind::ToolCompleted {
            ok, output, error, ..
        } => Some(Output::Stderr(tool_result_line(
            *ok,
            output,
            error.as_deref(),
        ))),
        RuntimeEventKind::Status {
            status: HumanInputStatus::Requested,
        } => Some(Output::Stderr("\n> ".to_string())),
        RuntimeEventKind::TurnCompleted { .. } => Some(Output::Stdout("\n".to_string())),
        RuntimeEventKind::TurnFailed { error } => Some(Output::Stderr(format!("\n❌ {error}\n"))),
        RuntimeEventKind::TurnStarted { .. }
        | RuntimeEventKind::StepStarted { .. }
        | RuntimeEventKind::Status {
            status: HumanInputStatus::Received,
        } => None,
    }
}

/// Render one engine event.
pub fn agent_event(event: &AgentEvent) -> Option<Output> {
    match &event.kind {
        AgentEventKind::Message(text) => Some(Output::Stdout(text.clone())),
        AgentEventKind::Thinking(text) => Some(Output::Stderr(text.clone())),
        AgentEventKind::ToolCall(call) => Some(Output::Stderr(format!(
            "\n⚡ {} ({})\n",
            call.name.as_deref().unwrap_or("tool"),
            call.id.as_deref().unwrap_or("-"),
        ))),
        AgentEventKind::ToolResult(result) => Some(Output::Stderr(tool_result_line(
            result.ok,
            &result.output,
            result.error.as_deref(),
        ))),
        AgentEventKind::Error(message) => Some(Output::Stderr(format!("\n❌ {message}\n"))),
        AgentEventKind::Status(_) => None,
    }
}
