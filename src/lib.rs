//! Turnkit: streaming turn orchestration for tool-using agents.
//!
//! Holds multi-turn conversations with an agent that may call tools
//! (including pausing to ask the human a question) while streaming its
//! reasoning and answer to any number of observers. Turns run one at a time
//! per session, every lifecycle event is sequenced and kept in a bounded
//! backlog for late joiners, and each turn is raced against a timeout.
//!
//! # Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use turnkit::prelude::*;
//!
//! # async fn example() -> turnkit::error::Result<()> {
//! let orchestrator = Orchestrator::openai(RuntimeConfig::load()?);
//! let mut events = orchestrator.stream("demo").await?;
//!
//! orchestrator
//!     .submit_turn(SubmitTurn::builder().session_id("demo").input("Hello!").build())
//!     .await?;
//!
//! while let Some(SseEvent { data }) = events.next().await {
//!     if let RuntimeEventKind::AssistantDelta { text, .. } = &data.event.kind {
//!         print!("{text}");
//!     }
//!     if data.event.kind.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod store;
pub mod tools;
pub mod transport;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
