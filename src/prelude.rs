//! Convenience re-exports for common use.

pub use crate::agent_loop::{AgentFactory, AgentGraph, GraphStream, ToolLoop};
pub use crate::config::RuntimeConfig;
pub use crate::engine::{Engine, EngineOutcome};
pub use crate::error::{Result, TurnkitError};
pub use crate::events::{
    AgentEvent, AgentEventKind, HumanInputStatus, RuntimeEvent, RuntimeEventKind, SseEvent,
    StreamEnvelope,
};
pub use crate::models::{ReasoningEffort, ReasoningOverride, ReasoningSummary, ResolvedModel};
pub use crate::provider::ChatModel;
pub use crate::runtime::{HumanInputReceipt, Orchestrator, Session, SubmitTurn, TurnReceipt};
pub use crate::tools::{AgentTool, AgentToolParameters, AskHumanTool, Tool, ToolArguments};
pub use crate::transport::{EventBusTransport, IpcTransport, SseTransport, Transport};
pub use crate::types::{MessageChunk, ModelMessage, Role};
