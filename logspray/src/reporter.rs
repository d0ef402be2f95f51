//! The live throughput reporter.
//!
//! Once a second, reads the shared success counter and rewrites a single
//! console line with the running total and the average delivery rate since
//! run start. Read-only with respect to the counter; never blocks the rest
//! of the pipeline. Optional, enabled by `RunConfig::metrics`.

use std::io::Write;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::time::{Duration, Instant, interval_at};

/// Periodically prints pipeline throughput.
#[derive(Debug)]
pub struct Reporter {
    delivered: Arc<AtomicU64>,
    shutdown: logspray_signal::Watcher,
}

impl Reporter {
    /// Create a new [`Reporter`] observing the shared success counter.
    #[must_use]
    pub fn new(delivered: Arc<AtomicU64>, shutdown: logspray_signal::Watcher) -> Self {
        Self {
            delivered,
            shutdown,
        }
    }

    /// Run the reporter until shutdown.
    #[allow(clippy::print_stdout)]
    pub async fn run(self) {
        let Self {
            delivered,
            shutdown,
        } = self;

        let start = Instant::now();
        // First sample lands a full period after start so the elapsed
        // divisor is never near zero.
        let mut ticker = interval_at(start + Duration::from_secs(1), Duration::from_secs(1));

        let shutdown_wait = shutdown.recv();
        tokio::pin!(shutdown_wait);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let count = delivered.load(Ordering::Relaxed);
                    let elapsed = start.elapsed().as_secs_f64();
                    let rate = count as f64 / elapsed;

                    let mut stdout = std::io::stdout();
                    // Ignore console write failures; reporting is best-effort.
                    let _ = write!(stdout, "\rLogs sent: {count}, Rate: {rate:.2} logs/sec");
                    let _ = stdout.flush();
                },
                () = &mut shutdown_wait => break,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, atomic::AtomicU64};

    use tokio::time::{Duration, sleep, timeout};

    use super::Reporter;

    // The reporter holds a shutdown watcher, so a stall here would hang the
    // coordinator's signal_and_wait. Let a few report intervals elapse, then
    // confirm the broadcaster is acknowledged promptly.
    #[tokio::test(start_paused = true)]
    async fn ticks_then_acknowledges_shutdown() {
        let (watcher, broadcaster) = logspray_signal::signal();
        let delivered = Arc::new(AtomicU64::new(42));
        let reporter = Reporter::new(Arc::clone(&delivered), watcher);
        let handle = tokio::spawn(reporter.run());

        sleep(Duration::from_secs(3)).await;

        timeout(Duration::from_secs(1), broadcaster.signal_and_wait())
            .await
            .expect("reporter did not acknowledge shutdown");
        handle.await.expect("reporter task panicked");
    }

    #[tokio::test]
    async fn immediate_shutdown_needs_no_tick() {
        let (watcher, broadcaster) = logspray_signal::signal();
        let reporter = Reporter::new(Arc::new(AtomicU64::new(0)), watcher);
        let handle = tokio::spawn(reporter.run());

        // Signal before the first report interval has elapsed.
        timeout(Duration::from_secs(1), broadcaster.signal_and_wait())
            .await
            .expect("reporter did not acknowledge shutdown");
        handle.await.expect("reporter task panicked");
    }
}
