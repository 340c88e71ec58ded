//! CoinGecko simple-price REST client

use super::{FetchError, PriceObservation, PriceSource};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

/// CoinGecko simple price endpoint
pub const COINGECKO_SIMPLE_PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Configuration for the CoinGecko client
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    /// Endpoint URL, without query string
    pub url: String,
    /// Coin identifier (e.g. "bitcoin")
    pub coin_id: String,
    /// Quote currency key as the API spells it (e.g. "usd")
    pub currency: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            url: COINGECKO_SIMPLE_PRICE_URL.to_string(),
            coin_id: "bitcoin".to_string(),
            currency: "usd".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for CoinGecko's `/simple/price` endpoint
pub struct CoinGeckoSource {
    config: CoinGeckoConfig,
    client: Client,
}

impl CoinGeckoSource {
    /// Create a client with default configuration
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(CoinGeckoConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: CoinGeckoConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, client })
    }

    /// Client configuration
    pub fn config(&self) -> &CoinGeckoConfig {
        &self.config
    }

    /// Extract `body[coin_id][currency]` as a positive decimal
    fn parse_price(&self, body: &Value) -> Result<Decimal, FetchError> {
        let field = format!("{}.{}", self.config.coin_id, self.config.currency);
        let raw = body
            .get(&self.config.coin_id)
            .and_then(|coin| coin.get(&self.config.currency))
            .ok_or_else(|| FetchError::MissingField(field.clone()))?;

        let price = match raw {
            Value::Number(n) => decimal_from_text(&n.to_string()),
            Value::String(s) => decimal_from_text(s.trim()),
            _ => None,
        }
        .ok_or_else(|| FetchError::InvalidPrice(raw.to_string()))?;

        if price <= Decimal::ZERO {
            return Err(FetchError::InvalidPrice(raw.to_string()));
        }

        Ok(price)
    }
}

/// Parse a JSON number's textual form without a float round trip
fn decimal_from_text(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn fetch(&self) -> Result<PriceObservation, FetchError> {
        tracing::debug!(url = %self.config.url, coin = %self.config.coin_id, "Fetching spot price");

        let response = self
            .client
            .get(&self.config.url)
            .query(&[
                ("ids", self.config.coin_id.as_str()),
                ("vs_currencies", self.config.currency.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body: Value = response.json().await?;
        let price = self.parse_price(&body)?;

        Ok(PriceObservation::now(price))
    }
}
