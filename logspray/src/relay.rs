//! The bounded hand-off relay between pacing and dispatch.
//!
//! A fixed-capacity queue with one producer (the pacer) and many consumers
//! (the dispatch workers). [`Producer::push`] blocks while the relay is full,
//! which is the pipeline's backpressure point: when dispatch cannot keep up,
//! generation is throttled instead of buffering without bound. Once the
//! relay is closed and drained every consumer observes end-of-stream.

use std::sync::Arc;

use logspray_payload::LogRecord;
use tokio::sync::{Mutex, mpsc};

/// Errors produced by [`Producer`].
#[derive(thiserror::Error, Debug, Clone, Copy)]
pub enum Error {
    /// The relay is closed; no further records will be accepted.
    #[error("relay is closed")]
    Closed,
}

/// Create a relay with the given capacity.
///
/// A zero capacity is clamped to one.
#[must_use]
pub fn bounded(capacity: usize) -> (Producer, Consumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        Producer { tx: Some(tx) },
        Consumer {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// The push half of the relay. Held by the pacer alone.
#[derive(Debug)]
pub struct Producer {
    /// `None` once the relay has been closed.
    tx: Option<mpsc::Sender<LogRecord>>,
}

impl Producer {
    /// Push a record into the relay, waiting for space if it is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the relay has been closed or every
    /// consumer has gone away. In either case the record is discarded.
    pub async fn push(&self, record: LogRecord) -> Result<(), Error> {
        let tx = self.tx.as_ref().ok_or(Error::Closed)?;
        tx.send(record).await.map_err(|_| Error::Closed)
    }

    /// Close the relay. Consumers drain whatever remains and then observe
    /// end-of-stream. Closing an already-closed relay is a no-op.
    pub fn close(&mut self) {
        self.tx.take();
    }
}

/// The pop half of the relay, shared by all dispatch workers.
#[derive(Debug, Clone)]
pub struct Consumer {
    rx: Arc<Mutex<mpsc::Receiver<LogRecord>>>,
}

impl Consumer {
    /// Pop the next record, waiting while the relay is open but empty.
    /// Returns `None` once the relay is closed and drained; every consumer
    /// observes this end-of-stream marker.
    pub async fn pop(&self) -> Option<LogRecord> {
        self.rx.lock().await.recv().await
    }
}
