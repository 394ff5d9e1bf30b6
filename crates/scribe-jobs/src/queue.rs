//! FIFO queue of job ids awaiting a free worker slot.
//!
//! Producers (the coordinator) never block: the channel is unbounded and
//! `enqueue` only takes a brief lock on the sender. Consumers (worker slots)
//! wait on `dequeue`; the receiver sits behind a fair async mutex so idle
//! workers are served in arrival order and every entry goes to exactly one
//! worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use uuid::Uuid;

use scribe_core::{Error, Result};

/// Work item handed from the coordinator to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub job_id: Uuid,
    pub input_locator: String,
}

pub struct JobQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<QueueEntry>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<QueueEntry>>,
    depth: AtomicUsize,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            depth: AtomicUsize::new(0),
        }
    }

    /// Append an entry. Fails only once the queue has been closed.
    pub fn enqueue(&self, entry: QueueEntry) -> Result<()> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = tx
            .as_ref()
            .ok_or_else(|| Error::Job("Job queue is closed".to_string()))?;
        self.depth.fetch_add(1, Ordering::SeqCst);
        if sender.send(entry).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::Job("Job queue is closed".to_string()));
        }
        Ok(())
    }

    /// Wait for the next entry.
    ///
    /// Returns `None` once the queue is closed and drained. Cancel safe: an
    /// entry is either returned or left in the queue.
    pub async fn dequeue(&self) -> Option<QueueEntry> {
        let mut rx = self.rx.lock().await;
        let entry = rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(entry)
    }

    /// Number of entries waiting for a worker.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Stop accepting new entries. Entries already queued can still be
    /// dequeued.
    pub fn close(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
