//! Price observation types

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currency every observation is quoted in
pub const QUOTE_CURRENCY: &str = "USD";

/// A single spot price read from the upstream API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Wall-clock time of the observation
    pub observed_at: DateTime<Utc>,
    /// Spot price
    pub price: Decimal,
    /// Quote currency, always [`QUOTE_CURRENCY`]
    pub currency: String,
}

impl PriceObservation {
    /// Create an observation taken at `observed_at`
    ///
    /// Sub-second precision is dropped so that `timestamp` and `observed_at`
    /// always describe the same instant.
    pub fn new(price: Decimal, observed_at: DateTime<Utc>) -> Self {
        let timestamp = observed_at.timestamp();
        let observed_at = Utc
            .timestamp_opt(timestamp, 0)
            .single()
            .unwrap_or(observed_at);
        Self {
            timestamp,
            observed_at,
            price,
            currency: QUOTE_CURRENCY.to_string(),
        }
    }

    /// Create an observation stamped with the current time
    pub fn now(price: Decimal) -> Self {
        Self::new(price, Utc::now())
    }
}

/// Price fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or undecodable body
    #[error("Price request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Upstream answered with a non-success status
    #[error("Price API returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// Expected field absent from the response body
    #[error("Price field missing from response: {0}")]
    MissingField(String),
    /// Field present but not a usable price
    #[error("Invalid price value: {0}")]
    InvalidPrice(String),
}
