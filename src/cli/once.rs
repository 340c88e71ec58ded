//! Once command implementation

use super::build_cycle;
use crate::config::Config;
use crate::feed::format::format_price;
use clap::Args;

#[derive(Args, Debug)]
pub struct OnceArgs {}

impl OnceArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let cycle = build_cycle(config)?;
        let report = cycle.run_once().await?;

        println!(
            "Published ${} USD ({} entries) to {}",
            format_price(report.observation.price),
            report.entries,
            cycle.publisher().target_dir().display()
        );
        Ok(())
    }
}
