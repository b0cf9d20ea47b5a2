//! Sequenced per-session event fan-out with a bounded replay backlog.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use chrono::Utc;
use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::{RuntimeEvent, SessionId, SseEvent, StreamEnvelope};

/// Assigns sequence numbers, keeps the backlog, and feeds live listeners.
///
/// Sequencing, backlog append and listener delivery happen under one lock,
/// as does snapshot-plus-register in [`EventHub::subscribe`]; a subscriber
/// therefore sees every envelope exactly once, in order.
pub struct EventHub {
    session_id: SessionId,
    capacity: usize,
    state: Mutex<HubState>,
}

struct HubState {
    last_seq: u64,
    backlog: VecDeque<StreamEnvelope>,
    listeners: HashMap<u64, mpsc::UnboundedSender<StreamEnvelope>>,
    next_listener: u64,
}

/// Called with the remaining listener count when a subscription closes.
pub type CloseHook = Box<dyn FnOnce(usize) + Send>;

impl EventHub {
    pub fn new(session_id: impl Into<SessionId>, capacity: usize) -> Arc<Self> {
        Self::resume(session_id, capacity, 0)
    }

    /// A hub whose next envelope gets seq `last_seq + 1`.
    pub fn resume(session_id: impl Into<SessionId>, capacity: usize, last_seq: u64) -> Arc<Self> {
        Arc::new(Self {
            session_id: session_id.into(),
            capacity: capacity.max(1),
            state: Mutex::new(HubState {
                last_seq,
                backlog: VecDeque::new(),
                listeners: HashMap::new(),
                next_listener: 0,
            }),
        })
    }

    /// Wrap, sequence, retain and broadcast one event.
    pub fn publish(&self, event: RuntimeEvent) -> StreamEnvelope {
        let mut state = self.state.lock();
        state.last_seq += 1;
        let envelope = StreamEnvelope {
            id: Uuid::new_v4(),
            session_id: self.session_id.clone(),
            seq: state.last_seq,
            timestamp: Utc::now(),
            event,
        };

        state.backlog.push_back(envelope.clone());
        while state.backlog.len() > self.capacity {
            state.backlog.pop_front();
        }
        state
            .listeners
            .retain(|_, tx| tx.send(envelope.clone()).is_ok());
        envelope
    }

    /// The most recent `limit` envelopes, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<StreamEnvelope> {
        let state = self.state.lock();
        let skip = state.backlog.len().saturating_sub(limit);
        state.backlog.iter().skip(skip).cloned().collect()
    }

    /// Backlog snapshot (up to `limit`, `0` for none) plus a live
    /// subscription starting right after it.
    pub fn subscribe(self: &Arc<Self>, limit: usize) -> (Vec<StreamEnvelope>, Subscription) {
        self.subscribe_with(limit, None)
    }

    /// Like [`subscribe`](Self::subscribe); `on_close` runs with the
    /// remaining listener count once the subscription is dropped.
    pub fn subscribe_with(
        self: &Arc<Self>,
        limit: usize,
        on_close: Option<CloseHook>,
    ) -> (Vec<StreamEnvelope>, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        let skip = state.backlog.len().saturating_sub(limit);
        let snapshot = state.backlog.iter().skip(skip).cloned().collect();

        let id = state.next_listener;
        state.next_listener += 1;
        state.listeners.insert(id, tx);

        let subscription = Subscription {
            rx,
            guard: ListenerGuard {
                hub: Arc::downgrade(self),
                id,
                on_close,
            },
        };
        (snapshot, subscription)
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub fn last_seq(&self) -> u64 {
        self.state.lock().last_seq
    }

    /// Drop every live listener; their streams end.
    pub fn close(&self) {
        self.state.lock().listeners.clear();
    }

    fn unregister(&self, id: u64) -> usize {
        let mut state = self.state.lock();
        state.listeners.remove(&id);
        state.listeners.len()
    }
}

/// Live envelopes for one observer, as SSE payloads. Unregisters on drop.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<StreamEnvelope>,
    guard: ListenerGuard,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<StreamEnvelope> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = SseEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx
            .poll_recv(cx)
            .map(|next| next.map(|data| SseEvent { data }))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("listener", &self.guard.id)
            .finish()
    }
}

struct ListenerGuard {
    hub: Weak<EventHub>,
    id: u64,
    on_close: Option<CloseHook>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let remaining = match self.hub.upgrade() {
            Some(hub) => hub.unregister(self.id),
            None => 0,
        };
        if let Some(on_close) = self.on_close.take() {
            on_close(remaining);
        }
    }
}
