//! Feed document types

use crate::price::PriceObservation;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Published feed file name
pub const FEED_FILE_NAME: &str = "bitcoin_price_feed.xml";
/// Published HTML summary file name
pub const HTML_FILE_NAME: &str = "index.html";
/// Structured history kept next to the feed
pub const SIDECAR_FILE_NAME: &str = "bitcoin_price_history.json";

/// One prior (or current) price point recovered from storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Price in USD
    pub price: Decimal,
    /// Publication time of the entry
    pub published: DateTime<Utc>,
}

impl HistoryRecord {
    /// Build a record whose publication time is derived from `timestamp`
    pub fn at(timestamp: i64, price: Decimal) -> Option<Self> {
        let published = Utc.timestamp_opt(timestamp, 0).single()?;
        Some(Self {
            timestamp,
            price,
            published,
        })
    }
}

impl From<&PriceObservation> for HistoryRecord {
    fn from(obs: &PriceObservation) -> Self {
        Self {
            timestamp: obs.timestamp,
            price: obs.price,
            published: obs.observed_at,
        }
    }
}

/// A single syndication entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// `<base_url>/price/<timestamp>`
    pub id: String,
    /// `Bitcoin Price: $<amount>`
    pub title: String,
    /// Entry link
    pub link: String,
    /// Prose with price and UTC timestamp
    pub description: String,
    /// Publication time
    pub published: DateTime<Utc>,
    /// Source record
    pub record: HistoryRecord,
}

/// Channel-level metadata, constant across cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    /// Channel id
    pub id: String,
    /// Channel title
    pub title: String,
    /// Heading of the HTML summary page
    pub page_title: String,
    /// Channel subtitle, rendered as the RSS description
    pub subtitle: String,
    /// Site link
    pub link: String,
    /// Absolute URL of the feed itself
    pub self_link: String,
    /// Language code
    pub language: String,
}

impl FeedMeta {
    /// Metadata for a feed served under `base_url`, refreshed every `interval_secs`
    pub fn new(base_url: &str, interval_secs: u64) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            id: format!("{}/bitcoin-price-feed", base),
            title: "Bitcoin Price Feed".to_string(),
            page_title: "Bitcoin Price RSS Feed".to_string(),
            subtitle: format!("Live Bitcoin price updates {}", describe_interval(interval_secs)),
            link: base.to_string(),
            self_link: format!("{}/{}", base, FEED_FILE_NAME),
            language: "en".to_string(),
        }
    }
}

fn describe_interval(secs: u64) -> String {
    match secs {
        60 => "every minute".to_string(),
        3600 => "every hour".to_string(),
        s if s % 3600 == 0 => format!("every {} hours", s / 3600),
        s if s % 60 == 0 => format!("every {} minutes", s / 60),
        1 => "every second".to_string(),
        s => format!("every {} seconds", s),
    }
}

/// Ordered entries, newest first, bounded in length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    /// Channel metadata
    pub meta: FeedMeta,
    /// Entries sorted descending by timestamp
    pub entries: Vec<FeedEntry>,
    /// Time the document was built
    pub built_at: DateTime<Utc>,
}

impl FeedDocument {
    /// Newest entry
    pub fn latest(&self) -> Option<&FeedEntry> {
        self.entries.first()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the document carries no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records in document order
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.entries.iter().map(|e| e.record.clone()).collect()
    }
}
