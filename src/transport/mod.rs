//! Transports: where engine events go out and human replies come in.
//!
//! The engine and the orchestrator only see [`Transport`]; each observer
//! surface supplies its own adapter:
//! - [`IpcTransport`]: message passing to a desktop UI process
//! - [`EventBusTransport`]: in-process bus for a terminal front-end
//! - [`SseTransport`]: `text/event-stream` frames on an open connection

pub mod bus;
pub mod input;
pub mod ipc;
pub mod sse;

pub use bus::EventBusTransport;
pub use input::{InputRequest, InputResponder, InputSlot};
pub use ipc::{IpcFrame, IpcHandle, IpcTransport};
pub use sse::{forward_events, SseInputHandle, SseTransport};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::events::AgentEvent;

/// Sink for engine events and source of human replies.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one event to the bound observer.
    ///
    /// May suspend (e.g. a network write) but must not drop the event; a
    /// broken channel is reported as an error.
    async fn emit(&self, event: AgentEvent) -> Result<()>;

    /// Register the single pending input request and wait for the reply.
    ///
    /// Fails with [`TurnkitError::InputAlreadyPending`](crate::error::TurnkitError::InputAlreadyPending)
    /// when another request is still outstanding.
    async fn request_input(&self) -> Result<String>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn emit(&self, event: AgentEvent) -> Result<()> {
        (**self).emit(event).await
    }

    async fn request_input(&self) -> Result<String> {
        (**self).request_input().await
    }
}
