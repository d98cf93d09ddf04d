mod upload;
mod watcher;

use std::time::Duration;

use breadboard::reqwest::Response;
use breadboard::{BreadboardClient, ConfigOverrides, Configuration};
use camino::Utf8PathBuf;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use env_logger::Env;
use reqwest_retry::{
    policies::ExponentialBackoff, RetryTransientMiddleware, Retryable, RetryableStrategy,
};

use crate::watcher::{FolderWatchdog, TickMode};

#[derive(Parser)]
#[clap(
    version,
    about = "Watch a folder for new images and upload their metadata to Breadboard"
)]
struct Cli {
    /// Folder your camera program writes images to
    folder: Utf8PathBuf,

    /// Client configuration file
    #[clap(long, env = "BREADBOARD_CONFIG", default_value = "API_CONFIG.json")]
    config: Utf8PathBuf,

    /// Lab name, overriding the configuration file
    #[clap(long)]
    lab_name: Option<String>,

    /// Milliseconds to wait between listings of the folder
    #[clap(long, value_name = "MS", default_value_t = 500)]
    interval_ms: u64,

    /// Upload only the new file which comes last by name on each listing,
    /// skipping any others
    #[clap(long)]
    latest_only: bool,

    /// Retry failed uploads this many times
    #[clap(long)]
    retries: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init_from_env(Env::new().default_filter_or("info"));
    let args: Cli = Cli::parse();

    let overrides = ConfigOverrides {
        lab_name: args.lab_name.map(|name| name.into()),
        ..Default::default()
    };
    let config = Configuration::from_file(&args.config, overrides)
        .wrap_err_with(|| format!("Invalid configuration {}", args.config))?;
    let builder = BreadboardClient::builder(&config)?;
    let client = match args.retries {
        Some(retries) => builder.with(retry_strategy(retries)).build(),
        None => builder.build(),
    };

    let mode = if args.latest_only {
        TickMode::LatestOnly
    } else {
        TickMode::All
    };
    let watchdog = FolderWatchdog::new(args.folder, client, mode)?;
    log::info!("Watching this folder for changes: {}", watchdog.folder());
    watchdog.run(Duration::from_millis(args.interval_ms)).await
}

fn retry_strategy(retries: u32) -> impl reqwest_middleware::Middleware {
    let policy = ExponentialBackoff::builder().build_with_max_retries(retries);
    RetryTransientMiddleware::new_with_policy_and_strategy(policy, RetryStrategy)
}

/// - Client errors are fatal
/// - Everything else can be retried
struct RetryStrategy;
impl RetryableStrategy for RetryStrategy {
    fn handle(&self, res: &Result<Response, reqwest_middleware::Error>) -> Option<Retryable> {
        if let Ok(response) = res {
            if response.status().is_server_error() {
                Some(Retryable::Transient)
            } else if response.status().is_client_error() {
                Some(Retryable::Fatal)
            } else {
                None
            }
        } else {
            Some(Retryable::Transient)
        }
    }
}
