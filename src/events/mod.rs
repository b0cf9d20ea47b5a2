//! Event vocabulary shared by the engine, transports and the orchestrator.
//!
//! Two layers:
//! - [`AgentEvent`]: what the engine (and tools) emit through a
//!   [`Transport`](crate::transport::Transport) while a turn runs.
//! - [`RuntimeEvent`] / [`StreamEnvelope`]: the turn/step/tool lifecycle
//!   delivered to observers, sequenced per session.

pub mod agent;
pub mod runtime;

pub use agent::*;
pub use runtime::*;

/// Session identifier (caller supplied).
pub type SessionId = String;
/// Turn identifier (uuid v4 string).
pub type TurnId = String;
/// Correlation id for one turn submission.
pub type RequestId = String;
/// Step identifier, `"{turn_id}:step:{n}"`.
pub type StepId = String;
