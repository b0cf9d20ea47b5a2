//! The agent capability seen by the engine.

use std::sync::Arc;

use futures::stream::BoxStream;

use crate::error::Result;
use crate::transport::Transport;
use crate::types::{GraphMessage, ModelMessage};

/// Stream of model chunks and tool results for one turn.
pub type GraphStream = BoxStream<'static, Result<GraphMessage>>;

/// An agent that, given a history, streams its work until no more tools are
/// requested.
///
/// The transport is handed through so tools that need a human can reach it.
pub trait AgentGraph: Send + Sync {
    fn stream(&self, history: Vec<ModelMessage>, transport: Arc<dyn Transport>) -> GraphStream;
}
