//! Turn orchestration runtime.
//!
//! One [`Orchestrator`] owns every session. Each session gets a serial turn
//! queue, an [`EventHub`] (sequencing, replay backlog, live listeners), a
//! [`LogBuffer`], and a single human-input slot.

pub mod hub;
pub mod logs;
pub mod orchestrator;
pub mod queue;
pub mod session;
pub mod turn;

pub use hub::{EventHub, Subscription};
pub use logs::{LogBuffer, LogEntry, LogLevel, LogScope};
pub use orchestrator::{
    clamp_limit, HumanInputReceipt, Orchestrator, SubmitTurn, TurnReceipt, DEFAULT_READ_LIMIT,
    MAX_READ_LIMIT,
};
pub use queue::SerialQueue;
pub use session::{RunStatus, Session, Step, ToolInvocation, Turn};
pub use turn::TurnContext;
