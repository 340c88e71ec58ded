//! Prometheus metrics

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::time::Duration;

/// Total cycles, labelled by outcome
pub const CYCLES_TOTAL: &str = "btc_feed_cycles_total";
/// Cycle wall time in seconds
pub const CYCLE_DURATION_SECONDS: &str = "btc_feed_cycle_duration_seconds";
/// Last published price
pub const LAST_PRICE_USD: &str = "btc_feed_last_price_usd";

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Feed was published
    Published,
    /// Price could not be fetched
    FetchFailed,
    /// Rendering or writing failed
    PublishFailed,
}

impl CycleOutcome {
    /// Label value
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Published => "published",
            CycleOutcome::FetchFailed => "fetch_failed",
            CycleOutcome::PublishFailed => "publish_failed",
        }
    }
}

/// Record a finished cycle
pub fn record_cycle(outcome: CycleOutcome, duration: Duration) {
    counter!(CYCLES_TOTAL, "outcome" => outcome.as_str()).increment(1);
    histogram!(CYCLE_DURATION_SECONDS).record(duration.as_secs_f64());
    tracing::debug!(
        metric = CYCLES_TOTAL,
        outcome = outcome.as_str(),
        duration_ms = duration.as_millis() as u64,
        "Recording cycle"
    );
}

/// Set the last published price gauge
pub fn set_last_price(price: Decimal) {
    if let Some(value) = price.to_f64() {
        gauge!(LAST_PRICE_USD).set(value);
    }
}

/// Serve `/metrics` on `addr`
pub fn init_metrics_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}
