//! Newsroom Monitor — status poller for the news-processing backend.
//!
//! Polls the backend's health and status endpoints on a fixed interval,
//! derives a state for each subsystem (AI index, compute API, database,
//! file transfer) and reports the resulting snapshot:
//! - `--once`: one poll cycle, snapshot printed as JSON on stdout
//! - otherwise: runs until Ctrl-C, logging every settled cycle

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod config;
mod poller;
mod report;
mod source;
mod status;

use config::{MonitorConfig, Overrides, View};
use poller::StatusPoller;
use source::http::HttpStatusSource;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long)]
    base_url: Option<String>,
    /// Seconds between poll cycles
    #[arg(long)]
    interval: Option<u64>,
    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Screen to feed (sets the recent-activity limit: dashboard 5, monitor 10)
    #[arg(long, value_enum)]
    view: Option<View>,
    /// Recent-activity limit, overriding the view default
    #[arg(long)]
    limit: Option<usize>,
    /// YAML config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Poll once, print the snapshot as JSON and exit
    #[arg(long)]
    once: bool,
    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            poll_interval_secs: self.interval,
            request_timeout_secs: self.timeout,
            view: self.view,
            activity_limit: self.limit,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "newsroom_monitor=info".into());

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut config =
        MonitorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(args.overrides());
    config.validate().context("Invalid configuration")?;

    info!(
        base_url = %config.base_url,
        interval_secs = config.poll_interval_secs,
        timeout_secs = config.request_timeout_secs,
        view = ?config.view,
        "Newsroom Monitor v{}",
        env!("CARGO_PKG_VERSION")
    );

    let source = HttpStatusSource::new(&config.base_url, config.request_timeout())
        .context("Failed to build HTTP client")?;
    let poller = StatusPoller::new(Arc::new(source), config.poller_settings());

    if args.once {
        poller.poll_once().await;
        let json = serde_json::to_string_pretty(&poller.snapshot())
            .context("Failed to serialize snapshot")?;
        println!("{}", json);
        return Ok(());
    }

    let handle = poller.start();
    let reporter = tokio::spawn(report::run_reporter(handle.subscribe()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown requested");

    handle.shutdown().await;
    reporter.abort();
    Ok(())
}
