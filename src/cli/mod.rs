//! CLI interface for btc-price-feed
//!
//! Provides subcommands for:
//! - `run`: Poll, publish and serve the feed
//! - `once`: Run a single publish cycle and exit
//! - `serve`: Serve the published directory only
//! - `config`: Show the effective configuration

mod once;
mod run;
mod serve;

pub use once::OnceArgs;
pub use run::RunArgs;
pub use serve::ServeArgs;

use crate::config::{Config, ConfigOverrides};
use crate::cycle::FeedCycle;
use crate::price::CoinGeckoSource;
use crate::publish::Publisher;
use crate::telemetry::LogFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "btc-price-feed")]
#[command(about = "Publishes the Bitcoin spot price as an RSS feed and serves it over HTTP")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "BTC_FEED_CONFIG", global = true)]
    pub config: String,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the price, publish the feed and serve it
    Run(RunArgs),
    /// Publish once and exit
    Once(OnceArgs),
    /// Serve the published directory without polling
    Serve(ServeArgs),
    /// Show the effective configuration
    Config,
}

/// Settings that override the configuration file
#[derive(Args, Debug, Default, Clone)]
pub struct OverrideArgs {
    /// Directory for the published feed
    #[arg(long, env = "BTC_FEED_OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Public base URL used in feed links
    #[arg(long, env = "BTC_FEED_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// HTTP listen port
    #[arg(short, long, env = "BTC_FEED_PORT", global = true)]
    pub port: Option<u16>,

    /// Seconds between price polls
    #[arg(long, env = "BTC_FEED_INTERVAL_SECS", global = true)]
    pub interval_secs: Option<u64>,

    /// Entries kept in the feed
    #[arg(long, env = "BTC_FEED_MAX_ENTRIES", global = true)]
    pub max_entries: Option<usize>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            output_dir: args.output_dir,
            base_url: args.base_url,
            port: args.port,
            interval_secs: args.interval_secs,
            max_entries: args.max_entries,
            log_level: args.log_level,
            log_format: args.log_format,
        }
    }
}

/// Build the publish cycle described by `config`
pub fn build_cycle(config: &Config) -> anyhow::Result<FeedCycle<CoinGeckoSource>> {
    let source = CoinGeckoSource::with_config(config.source.to_coingecko())?;
    Ok(FeedCycle::new(
        source,
        Publisher::new(&config.feed.output_dir),
        config.feed_meta(),
        config.feed.max_entries,
    ))
}

/// Resolves once Ctrl-C is received
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
