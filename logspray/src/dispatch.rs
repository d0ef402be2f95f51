//! The dispatch worker pool.
//!
//! A fixed set of workers drain the relay, accumulate records into batches
//! and hand the batches to the sink. Each worker is an explicit object with
//! its own identifier and shared handles; workers terminate independently
//! when they observe the relay's end-of-stream, flushing any partial batch
//! exactly once on the way out.
//!
//! ## Metrics
//!
//! `requests_sent`: Total delivery attempts
//! `request_ok`: Successful deliveries
//! `request_failure`: Failed deliveries
//! `records_delivered`: Total records acknowledged by the sink

use std::num::NonZeroUsize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use metrics::counter;
use tracing::{debug, warn};

use logspray_payload::LogRecord;

use crate::{relay, sink::Sink};

/// One dispatch worker.
#[derive(Debug)]
pub struct Worker<S> {
    id: u16,
    consumer: relay::Consumer,
    sink: Arc<S>,
    batch_size: usize,
    delivered: Arc<AtomicU64>,
}

impl<S> Worker<S>
where
    S: Sink,
{
    /// Create a new [`Worker`].
    pub fn new(
        id: u16,
        consumer: relay::Consumer,
        sink: Arc<S>,
        batch_size: NonZeroUsize,
        delivered: Arc<AtomicU64>,
    ) -> Self {
        Self {
            id,
            consumer,
            sink,
            batch_size: batch_size.get(),
            delivered,
        }
    }

    /// Run this worker until the relay reports end-of-stream.
    ///
    /// A delivery in flight when shutdown begins is allowed to complete;
    /// failed batches are dropped, never requeued.
    pub async fn run(self) {
        let mut batch: Vec<LogRecord> = Vec::with_capacity(self.batch_size);

        while let Some(record) = self.consumer.pop().await {
            batch.push(record);
            if batch.len() >= self.batch_size {
                self.flush(&mut batch).await;
            }
        }

        // End-of-stream: flush the partial batch once, then terminate.
        if !batch.is_empty() {
            self.flush(&mut batch).await;
        }
        debug!(worker = self.id, "worker drained");
    }

    /// Deliver the entire accumulated batch and account for the outcome. The
    /// batch is consumed either way.
    async fn flush(&self, batch: &mut Vec<LogRecord>) {
        counter!("requests_sent").increment(1);
        match self.sink.deliver(batch).await {
            Ok(()) => {
                let count = batch.len() as u64;
                self.delivered.fetch_add(count, Ordering::Relaxed);
                counter!("request_ok").increment(1);
                counter!("records_delivered").increment(count);
            }
            Err(err) => {
                warn!(worker = self.id, "failed to deliver batch: {err}");
                counter!("request_failure").increment(1);
            }
        }
        batch.clear();
    }
}
