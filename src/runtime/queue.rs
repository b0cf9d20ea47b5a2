//! Per-key serial job queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{Result, TurnkitError};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runs submitted jobs one at a time, in submission order.
///
/// Each job runs in its own task so a panicking job is logged and the next
/// one still runs. Dropping the queue lets already-queued jobs finish.
pub struct SerialQueue {
    name: String,
    tx: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
}

impl SerialQueue {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(name: impl Into<String>) -> Self {
        let name = name.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker_name = name.clone();
        let worker_pending = pending.clone();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(err) = tokio::spawn(job).await {
                    tracing::error!(queue = %worker_name, error = %err, "queued job panicked");
                }
                worker_pending.fetch_sub(1, Ordering::SeqCst);
            }
            tracing::debug!(queue = %worker_name, "queue worker stopped");
        });

        Self { name, tx, pending }
    }

    /// Append a job behind everything already queued.
    pub fn enqueue<F>(&self, job: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tx.send(Box::pin(job)).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            TurnkitError::Transport(format!("queue '{}' is closed", self.name))
        })
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn jobs_never_overlap() {
        let queue = SerialQueue::spawn("test");
        let log = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();

        for i in 0..3 {
            let log = log.clone();
            queue
                .enqueue(async move {
                    log.lock().push(format!("start {i}"));
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    log.lock().push(format!("end {i}"));
                })
                .unwrap();
        }
        queue
            .enqueue(async move {
                let _ = done_tx.send(());
            })
            .unwrap();
        done_rx.await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["start 0", "end 0", "start 1", "end 1", "start 2", "end 2"]
        );
    }

    #[tokio::test]
    async fn panicking_job_does_not_stop_queue() {
        let queue = SerialQueue::spawn("test");
        let (done_tx, done_rx) = oneshot::channel();
        queue.enqueue(async { panic!("boom") }).unwrap();
        queue
            .enqueue(async move {
                let _ = done_tx.send(());
            })
            .unwrap();
        done_rx.await.unwrap();
    }
}
