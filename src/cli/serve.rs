//! Serve command implementation

use super::shutdown_signal;
use crate::config::Config;
use crate::server;
use clap::Args;

#[derive(Args, Debug)]
pub struct ServeArgs {}

impl ServeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        server::serve(config.server.addr(), &config.feed.output_dir, shutdown_signal()).await?;
        Ok(())
    }
}
