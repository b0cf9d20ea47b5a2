//! Single-slot rendezvous for human input.

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Result, TurnkitError};

/// At most one outstanding input request, fulfilled at most once.
#[derive(Debug, Default)]
pub struct InputSlot {
    pending: Mutex<Option<oneshot::Sender<String>>>,
}

impl InputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the slot. Fails if a live request is already waiting.
    ///
    /// A request whose waiter has gone away (for example after a timed-out
    /// turn) does not count as pending and is replaced.
    pub fn arm(&self) -> Result<InputRequest> {
        let mut pending = self.pending.lock();
        if pending.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(TurnkitError::InputAlreadyPending);
        }
        let (tx, rx) = oneshot::channel();
        *pending = Some(tx);
        Ok(InputRequest { rx })
    }

    /// Hand `input` to the waiting request and clear the slot.
    ///
    /// Returns `false` (and changes nothing) when no request is pending.
    pub fn deliver(&self, input: impl Into<String>) -> bool {
        self.take().is_some_and(|responder| responder.respond(input))
    }

    /// Clear the slot and return the live request's reply handle, if any.
    ///
    /// Lets a caller announce the reply before the waiter wakes up.
    pub fn take(&self) -> Option<InputResponder> {
        let mut pending = self.pending.lock();
        if !pending.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return None;
        }
        pending.take().map(|tx| InputResponder { tx })
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Drop any outstanding request; its waiter sees [`TurnkitError::InputClosed`].
    pub fn cancel(&self) -> bool {
        self.pending.lock().take().is_some()
    }
}

/// Reply half taken out of an [`InputSlot`].
#[derive(Debug)]
pub struct InputResponder {
    tx: oneshot::Sender<String>,
}

impl InputResponder {
    /// `false` if the waiter went away in the meantime.
    pub fn respond(self, input: impl Into<String>) -> bool {
        self.tx.send(input.into()).is_ok()
    }
}

/// The waiting half of an armed [`InputSlot`].
#[derive(Debug)]
pub struct InputRequest {
    rx: oneshot::Receiver<String>,
}

impl InputRequest {
    /// Suspend until the reply arrives.
    pub async fn recv(self) -> Result<String> {
        self.rx.await.map_err(|_| TurnkitError::InputClosed)
    }
}
