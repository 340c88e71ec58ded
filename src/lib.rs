//! btc-price-feed: Bitcoin spot price published as an RSS feed
//!
//! This library provides the core components for:
//! - Fetching the BTC/USD spot price from CoinGecko
//! - Recovering prior feed history from structured or rendered storage
//! - Merging and rendering a bounded RSS 2.0 feed and HTML summary
//! - Atomic publishing via temp file and rename
//! - Interval scheduling with injectable triggers
//! - Serving the published directory over HTTP

pub mod cli;
pub mod config;
pub mod cycle;
pub mod feed;
pub mod price;
pub mod publish;
pub mod schedule;
pub mod server;
pub mod telemetry;
