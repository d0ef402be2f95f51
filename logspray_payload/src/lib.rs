//! The logspray payloads.
//!
//! This library supports synthetic record generation for the logspray
//! project: the record model that travels the dispatch pipeline and the
//! generator that mints randomized instances of it.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![allow(clippy::cast_precision_loss)]

pub use application_log::{ApplicationLog, Level, LogRecord};

pub mod application_log;
pub(crate) mod common;

/// Generate instances of `Self::Output` from a source of randomness.
///
/// Generation is infallible: implementations consume randomness and always
/// produce a well-formed output.
pub trait Generator {
    /// The type produced per call.
    type Output;

    /// Produce one new instance of `Self::Output`.
    fn generate<R>(&self, rng: &mut R) -> Self::Output
    where
        R: rand::Rng + ?Sized;
}
