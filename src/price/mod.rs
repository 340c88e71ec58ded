//! Price source module
//!
//! Fetches the current BTC/USD spot price from a REST endpoint

mod coingecko;
mod types;

pub use coingecko::{CoinGeckoConfig, CoinGeckoSource, COINGECKO_SIMPLE_PRICE_URL};
pub use types::{FetchError, PriceObservation, QUOTE_CURRENCY};

use async_trait::async_trait;

/// Trait for price source implementations
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch a single observation; one request, no retry
    async fn fetch(&self) -> Result<PriceObservation, FetchError>;
}
