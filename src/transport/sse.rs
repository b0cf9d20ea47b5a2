//! Server-sent events over an open connection.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{InputSlot, Transport};
use crate::error::Result;
use crate::events::{AgentEvent, SseEvent};

/// Writes each event as a `data: {json}\n\n` frame.
pub struct SseTransport<W> {
    writer: Mutex<W>,
    input: Arc<InputSlot>,
}

/// Delivers replies that arrive on a separate request (e.g. a POST).
#[derive(Clone)]
pub struct SseInputHandle {
    input: Arc<InputSlot>,
}

impl<W> SseTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            input: Arc::new(InputSlot::new()),
        }
    }

    pub fn input_handle(&self) -> SseInputHandle {
        SseInputHandle {
            input: self.input.clone(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl SseInputHandle {
    pub fn send_input(&self, text: impl Into<String>) -> bool {
        self.input.deliver(text)
    }

    pub fn awaiting_input(&self) -> bool {
        self.input.is_pending()
    }
}

#[async_trait]
impl<W> Transport for SseTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn emit(&self, event: AgentEvent) -> Result<()> {
        let frame = format!("data: {}\n\n", serde_json::to_string(&event)?);
        let mut writer = self.writer.lock().await;
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn request_input(&self) -> Result<String> {
        let request = self.input.arm()?;
        request.recv().await
    }
}

/// Pipe a live event stream (e.g. an orchestrator subscription) to an SSE
/// connection until either side ends.
///
/// Returns the number of frames written.
pub async fn forward_events<S, W>(events: S, writer: &mut W) -> Result<u64>
where
    S: Stream<Item = SseEvent>,
    W: AsyncWrite + Unpin,
{
    futures::pin_mut!(events);
    let mut written = 0u64;
    while let Some(event) = events.next().await {
        let frame = event.to_frame()?;
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
        written += 1;
    }
    Ok(written)
}
