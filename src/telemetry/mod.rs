//! Telemetry module
//!
//! Logging and metrics

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use self::metrics::{
    init_metrics_exporter, record_cycle, set_last_price, CycleOutcome, CYCLES_TOTAL,
    CYCLE_DURATION_SECONDS, LAST_PRICE_USD,
};

use crate::config::TelemetryConfig;
use std::net::SocketAddr;

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)?;

    if let Some(port) = config.metrics_port {
        init_metrics_exporter(SocketAddr::from(([0, 0, 0, 0], port)))?;
    }

    Ok(())
}
