//! Message-passing transport for a desktop UI process.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{InputSlot, Transport};
use crate::error::{Result, TurnkitError};
use crate::events::AgentEvent;

/// Channel carrying engine events to the UI.
pub const EVENT_CHANNEL: &str = "agent:event";
/// Channel carrying human replies back from the UI.
pub const USER_INPUT_CHANNEL: &str = "agent:user-input";

/// One message on the IPC pipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpcFrame {
    pub channel: String,
    pub payload: AgentEvent,
}

impl IpcFrame {
    pub fn event(payload: AgentEvent) -> Self {
        Self {
            channel: EVENT_CHANNEL.to_string(),
            payload,
        }
    }
}

/// Engine side of the pipe.
pub struct IpcTransport {
    outbound: mpsc::UnboundedSender<IpcFrame>,
    input: Arc<InputSlot>,
}

/// UI side of the pipe: receives frames, sends replies.
pub struct IpcHandle {
    inbound: mpsc::UnboundedReceiver<IpcFrame>,
    input: Arc<InputSlot>,
}

impl IpcTransport {
    /// Create a connected transport/handle pair.
    pub fn channel() -> (Self, IpcHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let input = Arc::new(InputSlot::new());
        (
            Self {
                outbound: tx,
                input: input.clone(),
            },
            IpcHandle { inbound: rx, input },
        )
    }
}

#[async_trait]
impl Transport for IpcTransport {
    async fn emit(&self, event: AgentEvent) -> Result<()> {
        self.outbound
            .send(IpcFrame::event(event))
            .map_err(|_| TurnkitError::Transport("ipc peer disconnected".into()))
    }

    async fn request_input(&self) -> Result<String> {
        let request = self.input.arm()?;
        request.recv().await
    }
}

impl IpcHandle {
    /// Next frame from the engine, `None` once the transport is dropped.
    pub async fn recv(&mut self) -> Option<IpcFrame> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<IpcFrame> {
        self.inbound.try_recv().ok()
    }

    /// Answer the pending input request on [`USER_INPUT_CHANNEL`].
    pub fn send_input(&self, text: impl Into<String>) -> bool {
        let delivered = self.input.deliver(text);
        tracing::debug!(channel = USER_INPUT_CHANNEL, delivered, "ipc input");
        delivered
    }

    pub fn awaiting_input(&self) -> bool {
        self.input.is_pending()
    }
}
