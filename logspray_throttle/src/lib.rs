//! The logspray pacing mechanism.
//!
//! Callers loop on [`Throttle::wait`] and receive permission to produce one
//! record at a time, spaced so that the configured records-per-second rate is
//! held over the run. Time is injected through the [`Clock`] trait so that
//! tests can drive the throttle without waiting on the wall clock.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::num::NonZeroU32;

use async_trait::async_trait;
use tokio::time::{self, Duration, Instant};

// One tick per microsecond. All pacing arithmetic is done in ticks.
const TICKS_PER_SECOND: u64 = 1_000_000;

#[async_trait]
/// The clock a [`Throttle`] measures time against.
pub trait Clock {
    /// Ticks elapsed since the clock was created.
    fn ticks_elapsed(&self) -> u64;
    /// Suspend the caller for `ticks` worth of time.
    async fn wait(&self, ticks: u64);
}

#[derive(Debug, Clone, Copy)]
/// A [`Clock`] backed by real time.
pub struct RealClock {
    start: Instant,
}

impl Default for RealClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

#[async_trait]
impl Clock for RealClock {
    /// Return the number of ticks since this clock was created.
    ///
    /// # Panics
    ///
    /// Function will panic if more than `u64::MAX` ticks have elapsed, an
    /// interval of several hundred thousand years.
    #[allow(clippy::cast_possible_truncation)]
    fn ticks_elapsed(&self) -> u64 {
        let ticks_since: u128 = self.start.elapsed().as_micros();
        assert!(
            ticks_since <= u128::from(u64::MAX),
            "clock overflow, process has run for centuries"
        );
        ticks_since as u64
    }

    async fn wait(&self, ticks: u64) {
        time::sleep(Duration::from_micros(ticks)).await;
    }
}

/// The pacing throttle.
///
/// Grants pass at a steady rate with respect to its [`Clock`] and makes no
/// inspection of the consumer: a caller that falls behind does not get to
/// catch up by bursting.
#[derive(Debug)]
pub struct Throttle<C = RealClock> {
    valve: Valve,
    clock: C,
}

impl Throttle<RealClock> {
    /// Create a new `Throttle` granting `records_per_second` passes per
    /// second of real time.
    #[must_use]
    pub fn new(records_per_second: NonZeroU32) -> Self {
        Self::with_clock(records_per_second, RealClock::default())
    }
}

impl<C> Throttle<C>
where
    C: Clock + Send + Sync,
{
    /// Create a new `Throttle` against the given clock.
    #[must_use]
    pub fn with_clock(records_per_second: NonZeroU32, clock: C) -> Self {
        Self {
            valve: Valve::new(records_per_second),
            clock,
        }
    }

    /// Wait until the next pass is granted.
    #[inline]
    pub async fn wait(&mut self) {
        loop {
            let slop = self.valve.admit(self.clock.ticks_elapsed());
            if slop == 0 {
                break;
            }
            self.clock.wait(slop).await;
        }
    }
}

/// The non-async interior of [`Throttle`], about which we can state
/// properties. Divides time into fixed intervals; each interval holds a fixed
/// number of passes and unspent passes do not carry over.
#[derive(Debug)]
struct Valve {
    /// Width of one interval, in ticks.
    interval_ticks: u64,
    /// Passes granted per interval.
    passes_per_interval: u32,
    /// Passes remaining in the current interval.
    remaining: u32,
    /// Index of the current interval.
    interval: u64,
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Valve {
    #[allow(clippy::cast_possible_truncation)]
    fn new(records_per_second: NonZeroU32) -> Self {
        let rate = u64::from(records_per_second.get());
        // Below one record per tick we space single passes 1/rate seconds
        // apart. At or above it intervals shrink to the smallest width that
        // carries a whole number of passes, so rates that are not a multiple
        // of the tick resolution do not truncate.
        let (interval_ticks, passes_per_interval) = if rate < TICKS_PER_SECOND {
            (TICKS_PER_SECOND / rate, 1)
        } else {
            let divisor = gcd(rate, TICKS_PER_SECOND);
            (TICKS_PER_SECOND / divisor, (rate / divisor) as u32)
        };
        Self {
            interval_ticks,
            passes_per_interval,
            remaining: passes_per_interval,
            interval: 0,
        }
    }

    /// Request one pass at absolute time `ticks_elapsed`. Returns 0 if the
    /// pass is granted, otherwise the number of ticks until the current
    /// interval rolls over. No pass is consumed on a non-zero return.
    fn admit(&mut self, ticks_elapsed: u64) -> u64 {
        let current_interval = ticks_elapsed / self.interval_ticks;
        if current_interval > self.interval {
            // Rolled into a new interval, restore the full allotment. Unspent
            // passes from prior intervals are forfeit.
            self.remaining = self.passes_per_interval;
            self.interval = current_interval;
        }

        if self.remaining > 0 {
            self.remaining -= 1;
            0
        } else {
            self.interval_ticks - (ticks_elapsed % self.interval_ticks)
        }
    }
}
