//! In-process event bus for a terminal front-end.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{InputSlot, Transport};
use crate::error::Result;
use crate::events::AgentEvent;

/// Most events held for a subscriber that has not attached yet.
pub const UNDELIVERED_CAPACITY: usize = 1000;

#[derive(Default)]
struct BusState {
    subscribers: Vec<mpsc::UnboundedSender<AgentEvent>>,
    /// Emitted while nobody was listening; handed to the next subscriber.
    undelivered: VecDeque<AgentEvent>,
}

/// Fans each event out to every live subscriber.
///
/// Subscribers get unbounded queues so a slow renderer never loses events.
/// Events emitted with no subscriber attached are held (up to
/// [`UNDELIVERED_CAPACITY`], oldest dropped first) and replayed to the next
/// one to subscribe.
#[derive(Default)]
pub struct EventBusTransport {
    state: Mutex<BusState>,
    input: Arc<InputSlot>,
}

impl EventBusTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events emitted from now on, preceded by any held while nobody listened.
    pub fn subscribe(&self) -> UnboundedReceiverStream<AgentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        for event in state.undelivered.drain(..) {
            let _ = tx.send(event);
        }
        state.subscribers.push(tx);
        UnboundedReceiverStream::new(rx)
    }

    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock();
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }

    /// Answer the pending input request. `false` when nothing is waiting.
    pub fn send_input(&self, text: impl Into<String>) -> bool {
        self.input.deliver(text)
    }

    pub fn awaiting_input(&self) -> bool {
        self.input.is_pending()
    }
}

#[async_trait]
impl Transport for EventBusTransport {
    async fn emit(&self, event: AgentEvent) -> Result<()> {
        let mut state = self.state.lock();
        state.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if state.subscribers.is_empty() {
            if state.undelivered.len() == UNDELIVERED_CAPACITY {
                state.undelivered.pop_front();
            }
            state.undelivered.push_back(event);
        }
        Ok(())
    }

    async fn request_input(&self) -> Result<String> {
        let request = self.input.arm()?;
        request.recv().await
    }
}
