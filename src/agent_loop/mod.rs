//! Agent graphs: what the engine drives.

pub mod factory;
pub mod graph;
pub mod tool_loop;

pub use factory::{AgentFactory, CachedAgentFactory};
#[cfg(feature = "openai")]
pub use factory::OpenAiAgentFactory;
pub use graph::{AgentGraph, GraphStream};
pub use tool_loop::ToolLoop;
