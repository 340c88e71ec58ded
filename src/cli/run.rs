//! Run command implementation

use super::{build_cycle, shutdown_signal};
use crate::config::Config;
use crate::schedule::{IntervalTrigger, Scheduler};
use crate::server;
use clap::Args;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Poll and publish without starting the HTTP server
    #[arg(long)]
    pub no_serve: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let cycle = build_cycle(config)?;
        let interval = config.schedule.interval();
        tokio::fs::create_dir_all(&config.feed.output_dir).await?;

        tracing::info!(
            interval_secs = interval.as_secs(),
            max_entries = config.feed.max_entries,
            dir = ?config.feed.output_dir,
            "Starting price feed"
        );

        let scheduler = tokio::spawn(async move {
            Scheduler::new(IntervalTrigger::new(interval)).run(&cycle).await
        });

        if self.no_serve {
            shutdown_signal().await;
        } else {
            let served = server::serve(
                config.server.addr(),
                &config.feed.output_dir,
                shutdown_signal(),
            )
            .await;
            if let Err(e) = served {
                scheduler.abort();
                return Err(anyhow::anyhow!("HTTP server failed: {}", e));
            }
        }

        // Cycles have no cancellation point; stop between or during one
        scheduler.abort();
        Ok(())
    }
}
