//! The rate pacer.
//!
//! Produces one record per throttle grant and hands it to the relay. A full
//! relay blocks the pacer, throttling generation instead of buffering
//! without bound. The pacer stops when the shutdown watcher fires -- the
//! coordinator raises that signal for both duration expiry and operator
//! interrupt -- and closes the relay on the way out so workers can drain to
//! end-of-stream.

use std::num::NonZeroU32;

use rand::{SeedableRng, rngs::SmallRng};
use tracing::info;

use logspray_payload::{ApplicationLog, Generator};
use logspray_throttle::Throttle;

use crate::relay;

/// The record producer, paced at the configured rate.
#[derive(Debug)]
pub struct Pacer {
    throttle: Throttle,
    generator: ApplicationLog,
    producer: relay::Producer,
    shutdown: logspray_signal::Watcher,
    rng: SmallRng,
}

impl Pacer {
    /// Create a new [`Pacer`] producing `rate` records per second.
    #[must_use]
    pub fn new(
        rate: NonZeroU32,
        producer: relay::Producer,
        shutdown: logspray_signal::Watcher,
    ) -> Self {
        Self {
            throttle: Throttle::new(rate),
            generator: ApplicationLog::new(),
            producer,
            shutdown,
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Run the pacer until shutdown, then close the relay.
    pub async fn run(self) {
        let Self {
            mut throttle,
            generator,
            mut producer,
            shutdown,
            mut rng,
        } = self;

        let shutdown_wait = shutdown.recv();
        tokio::pin!(shutdown_wait);
        loop {
            tokio::select! {
                () = throttle.wait() => {
                    let record = generator.generate(&mut rng);
                    // A full relay parks us here until a worker frees space.
                    if producer.push(record).await.is_err() {
                        info!("all dispatch workers gone, pacer stopping");
                        break;
                    }
                },
                () = &mut shutdown_wait => {
                    info!("shutdown signal received, pacer stopping");
                    break;
                },
            }
        }
        producer.close();
    }
}
