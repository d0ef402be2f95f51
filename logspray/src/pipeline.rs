//! Pipeline wiring and shutdown coordination.
//!
//! One run: a pacer feeding the relay, a pool of dispatch workers draining
//! it, an optional throughput reporter, and a coordinator watching for the
//! run duration to elapse or an interrupt to arrive. On either event exactly
//! one teardown sequence executes: the pacer stops and closes the relay,
//! workers drain to end-of-stream and flush, the reporter stops, and the
//! final tally is returned.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{task::JoinSet, time::sleep};
use tracing::{debug, info};

use crate::{
    config::{self, RunConfig},
    dispatch::Worker,
    pacer::Pacer,
    relay,
    reporter::Reporter,
    sink::{self, HttpSink, Sink},
};

/// Errors produced by [`run`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configuration cannot drive a run.
    #[error(transparent)]
    Config(#[from] config::Error),
    /// The sink could not be constructed.
    #[error(transparent)]
    Sink(#[from] sink::Error),
}

/// The outcome of one completed run.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    /// Total records acknowledged by the sink.
    pub delivered: u64,
}

/// Run the pipeline against the configured HTTP ingest endpoint.
///
/// Returns once the run duration has elapsed or an interrupt signal arrived,
/// and every in-flight delivery has completed.
///
/// # Errors
///
/// Function will return an error if the configuration is invalid or the sink
/// cannot be constructed. Both are fatal before any work starts.
pub async fn run(config: RunConfig) -> Result<Summary, Error> {
    config.validate()?;
    let sink = Arc::new(HttpSink::new(&config.target_uri)?);
    Ok(run_with_sink(config, sink).await)
}

/// Resolves when the operator interrupts the run: SIGINT, or SIGTERM on
/// unix targets.
async fn interrupted() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {err}");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Run the pipeline against an arbitrary [`Sink`].
pub async fn run_with_sink<S>(config: RunConfig, sink: Arc<S>) -> Summary
where
    S: Sink + 'static,
{
    let (shutdown_watcher, shutdown_broadcast) = logspray_signal::signal();
    let (timer_watcher, timer_broadcast) = logspray_signal::signal();

    let delivered = Arc::new(AtomicU64::new(0));
    let (producer, consumer) = relay::bounded(config.relay_capacity());

    //
    // DISPATCH POOL
    //
    let mut workers = JoinSet::new();
    for id in 0..config.workers.get() {
        let worker = Worker::new(
            id,
            consumer.clone(),
            Arc::clone(&sink),
            config.batch_size,
            Arc::clone(&delivered),
        );
        workers.spawn(worker.run());
    }
    // Workers hold the only remaining consumer handles; once they finish the
    // relay is fully drained.
    drop(consumer);

    //
    // PACER
    //
    let pacer = Pacer::new(config.rate, producer, shutdown_watcher.clone());
    tokio::spawn(pacer.run());

    //
    // REPORTER
    //
    if config.metrics {
        let reporter = Reporter::new(Arc::clone(&delivered), shutdown_watcher.clone());
        tokio::spawn(reporter.run());
    }

    // Any watcher still derived from `shutdown_watcher` at signal time will
    // hold `signal_and_wait` open, so release ours now.
    drop(shutdown_watcher);

    //
    // RUN TIMER
    //
    let duration = config.duration;
    tokio::spawn(async move {
        sleep(duration).await;
        debug!("run duration elapsed");
        timer_broadcast.signal();
    });

    let timer_wait = timer_watcher.recv();
    tokio::pin!(timer_wait);
    tokio::select! {
        () = interrupted() => {
            info!("received interrupt signal, shutting down");
        },
        () = &mut timer_wait => {
            info!("run duration elapsed, shutting down");
        },
    }

    // The single teardown path. Whichever condition lost the select above is
    // abandoned here; a second interrupt during teardown has nothing left to
    // trigger. The pacer acknowledges after closing the relay, the workers
    // then drain to end-of-stream and flush their partial batches.
    shutdown_broadcast.signal_and_wait().await;
    while workers.join_next().await.is_some() {}

    Summary {
        delivered: delivered.load(Ordering::Relaxed),
    }
}
