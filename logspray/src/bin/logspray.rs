use std::num::{NonZeroU16, NonZeroU32, NonZeroUsize};
use std::str::FromStr;

use clap::Parser;
use http::Uri;
use logspray::{config::RunConfig, pipeline};
use tokio::{runtime::Builder, time::Duration};
use tracing::info;
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid target URI: {0}")]
    TargetUri(#[from] http::uri::InvalidUri),
    #[error(transparent)]
    Pipeline(#[from] pipeline::Error),
}

fn default_target_uri() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// base URI of the log ingest service
    #[clap(long, default_value_t = default_target_uri())]
    target_uri: String,
    /// number of logs to generate per second
    #[clap(long, default_value_t = NonZeroU32::new(10).expect("non-zero"))]
    rate: NonZeroU32,
    /// the time, in seconds, to run the generator
    #[clap(long, default_value_t = 300)]
    duration_seconds: u64,
    /// number of concurrent dispatch workers
    #[clap(long, default_value_t = NonZeroU16::new(5).expect("non-zero"))]
    workers: NonZeroU16,
    /// number of logs accumulated per worker before delivery
    #[clap(long, default_value_t = NonZeroUsize::new(1).expect("non-zero"))]
    batch_size: NonZeroUsize,
    /// capacity of the hand-off relay, defaults to rate * workers
    #[clap(long)]
    relay_capacity: Option<NonZeroUsize>,
    /// disable the live throughput line
    #[clap(long)]
    no_metrics: bool,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig, Error> {
        Ok(RunConfig {
            target_uri: Uri::from_str(&self.target_uri)?,
            rate: self.rate,
            duration: Duration::from_secs(self.duration_seconds),
            workers: self.workers,
            batch_size: self.batch_size,
            relay_capacity: self.relay_capacity,
            metrics: !self.no_metrics,
        })
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting logspray {version} run.");

    let cli = Cli::parse();
    let config = cli.into_config()?;
    info!(
        target_uri = %config.target_uri,
        rate = config.rate.get(),
        duration_seconds = config.duration.as_secs(),
        workers = config.workers.get(),
        batch_size = config.batch_size.get(),
        "run parameters"
    );

    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let summary = runtime.block_on(pipeline::run(config))?;

    println!("\nLog generator stopped. Total logs sent: {}", summary.delivered);
    Ok(())
}
