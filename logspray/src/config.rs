//! Run configuration.
//!
//! All parameters are established once at startup and fixed for the life of
//! the run. Invalid parameters are fatal before any pipeline task spawns;
//! most invalid states are unrepresentable through the `NonZero` field types.

use std::num::{NonZeroU16, NonZeroU32, NonZeroUsize};

use http::Uri;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// Errors produced when validating a [`RunConfig`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The target URI lacks a scheme or authority to POST against.
    #[error("target URI must carry a scheme and authority: {uri}")]
    IncompleteTargetUri {
        /// The offending URI.
        uri: String,
    },
    /// The run duration is zero.
    #[error("run duration must be non-zero")]
    ZeroDuration,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
/// Configuration of one logspray run.
pub struct RunConfig {
    /// Base URI of the ingest service. Records are POSTed to
    /// `<target_uri>/api/logs`.
    #[serde(with = "http_serde::uri")]
    pub target_uri: Uri,
    /// Records generated per second.
    pub rate: NonZeroU32,
    /// Total run duration, measured from pipeline start.
    pub duration: Duration,
    /// Number of concurrent dispatch workers.
    pub workers: NonZeroU16,
    /// Records accumulated per worker before a delivery is attempted.
    pub batch_size: NonZeroUsize,
    /// Capacity of the hand-off relay between pacing and dispatch. Defaults
    /// to `rate * workers` when unset.
    pub relay_capacity: Option<NonZeroUsize>,
    /// Whether to print the live throughput line.
    pub metrics: bool,
}

impl RunConfig {
    /// The effective relay capacity for this run.
    #[must_use]
    pub fn relay_capacity(&self) -> usize {
        self.relay_capacity.map_or_else(
            || (self.rate.get() as usize).saturating_mul(usize::from(self.workers.get())),
            NonZeroUsize::get,
        )
    }

    /// Confirm that this configuration can drive a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the target URI is not absolute or the duration is
    /// zero. Either condition aborts startup before any work begins.
    pub fn validate(&self) -> Result<(), Error> {
        if self.target_uri.scheme().is_none() || self.target_uri.authority().is_none() {
            return Err(Error::IncompleteTargetUri {
                uri: self.target_uri.to_string(),
            });
        }
        if self.duration.is_zero() {
            return Err(Error::ZeroDuration);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::num::{NonZeroU16, NonZeroU32, NonZeroUsize};

    use http::Uri;
    use tokio::time::Duration;

    use super::RunConfig;

    fn config() -> RunConfig {
        RunConfig {
            target_uri: Uri::from_static("http://localhost:8080"),
            rate: NonZeroU32::new(10).expect("non-zero"),
            duration: Duration::from_secs(300),
            workers: NonZeroU16::new(5).expect("non-zero"),
            batch_size: NonZeroUsize::new(1).expect("non-zero"),
            relay_capacity: None,
            metrics: true,
        }
    }

    #[test]
    fn relay_capacity_defaults_to_rate_times_workers() {
        let config = config();
        assert_eq!(config.relay_capacity(), 50);
    }

    #[test]
    fn explicit_relay_capacity_wins() {
        let mut config = config();
        config.relay_capacity = NonZeroUsize::new(7);
        assert_eq!(config.relay_capacity(), 7);
    }

    #[test]
    fn relative_target_uri_is_rejected() {
        let mut config = config();
        config.target_uri = Uri::from_static("/api/logs");
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut config = config();
        config.duration = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn well_formed_config_passes() {
        assert!(config().validate().is_ok());
    }
}
