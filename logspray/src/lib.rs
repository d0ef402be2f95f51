//! The logspray load generation tool.
//!
//! This library supports the logspray binary found elsewhere in this project:
//! a generator that mints randomized log records at a fixed rate and delivers
//! them concurrently to an HTTP log ingest endpoint, reporting throughput
//! while it runs and tearing down cleanly on interrupt or elapsed duration.

#![deny(clippy::all)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod dispatch;
pub mod pacer;
pub mod pipeline;
pub mod relay;
pub mod reporter;
pub mod sink;
