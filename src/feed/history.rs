//! Prior-history recovery
//!
//! History is read by an ordered list of strategies. The published feed is
//! authoritative: without it there is no history. The structured sidecar
//! written next to the feed is tried first, and is only trusted when its
//! newest record matches the newest item of the feed. Otherwise the RSS
//! document itself is parsed, first strictly with `quick-xml`, then by a
//! lenient scan that survives truncated files.
//!
//! Reading never fails: anything unrecoverable degrades to empty history.

use super::format::{parse_price, parse_rss_date};
use super::types::{HistoryRecord, SIDECAR_FILE_NAME};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current sidecar layout version
pub const SIDECAR_VERSION: u32 = 1;

/// Strategies in the order [`read_history`] tries them
pub const DEFAULT_STRATEGIES: [HistoryStrategy; 3] = [
    HistoryStrategy::Sidecar,
    HistoryStrategy::Xml,
    HistoryStrategy::Lenient,
];

/// Why a strategy could not produce history
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Sidecar JSON is malformed
    #[error("Invalid history sidecar: {0}")]
    Json(#[from] serde_json::Error),
    /// Sidecar written by an unknown layout
    #[error("Unsupported history sidecar version {0}")]
    UnsupportedVersion(u32),
    /// Feed XML is not well formed
    #[error("Malformed feed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Feed ended with unclosed elements
    #[error("Feed document is truncated")]
    Truncated,
    /// Input does not look like an RSS document
    #[error("Not an RSS document")]
    NotAFeed,
}

/// Structured history persisted alongside the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySidecar {
    /// Layout version
    pub version: u32,
    /// Records, newest first
    pub records: Vec<HistoryRecord>,
}

/// Same layout with records left undecoded, so bad ones can be skipped
#[derive(Deserialize)]
struct RawSidecar {
    version: u32,
    records: Vec<serde_json::Value>,
}

/// Serialize records into sidecar bytes
pub fn encode_sidecar(records: &[HistoryRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let sidecar = HistorySidecar {
        version: SIDECAR_VERSION,
        records: records.to_vec(),
    };
    let mut bytes = serde_json::to_vec_pretty(&sidecar)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// A way of recovering history from durable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStrategy {
    /// JSON record list next to the feed
    Sidecar,
    /// Well-formed RSS parsed with `quick-xml`
    Xml,
    /// Substring scan over `<item>` blocks
    Lenient,
}

impl HistoryStrategy {
    /// Strategy name for logs
    pub fn name(&self) -> &'static str {
        match self {
            HistoryStrategy::Sidecar => "sidecar",
            HistoryStrategy::Xml => "xml",
            HistoryStrategy::Lenient => "lenient",
        }
    }

    /// File this strategy reads, given the feed path
    pub fn source(&self, feed_path: &Path) -> PathBuf {
        match self {
            HistoryStrategy::Sidecar => feed_path.with_file_name(SIDECAR_FILE_NAME),
            HistoryStrategy::Xml | HistoryStrategy::Lenient => feed_path.to_path_buf(),
        }
    }

    /// Parse history from the source file's contents
    pub fn parse(&self, content: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
        match self {
            HistoryStrategy::Sidecar => parse_sidecar(content),
            HistoryStrategy::Xml => parse_xml(content),
            HistoryStrategy::Lenient => parse_lenient(content),
        }
    }
}

/// Read prior history for the feed at `feed_path` using [`DEFAULT_STRATEGIES`]
pub async fn read_history(feed_path: &Path) -> Vec<HistoryRecord> {
    read_history_with(feed_path, &DEFAULT_STRATEGIES).await
}

/// Read prior history, trying `strategies` in order until one succeeds
pub async fn read_history_with(feed_path: &Path, strategies: &[HistoryStrategy]) -> Vec<HistoryRecord> {
    let feed = match tokio::fs::read(feed_path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = ?feed_path, "No prior feed found, starting fresh");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(path = ?feed_path, error = %e, "Failed to read feed, discarding history");
            return Vec::new();
        }
    };
    let newest = newest_item_timestamp(&feed);

    for strategy in strategies {
        let records = match strategy {
            HistoryStrategy::Sidecar => {
                let source = strategy.source(feed_path);
                let content = match tokio::fs::read(&source).await {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        tracing::debug!(strategy = strategy.name(), path = ?source, "History source absent");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(strategy = strategy.name(), path = ?source, error = %e, "Failed to read history source");
                        continue;
                    }
                };
                match strategy.parse(&content) {
                    Ok(records) if records.first().map(|r| r.timestamp) != newest => {
                        tracing::warn!(
                            path = ?source,
                            sidecar_newest = ?records.first().map(|r| r.timestamp),
                            feed_newest = ?newest,
                            "History sidecar does not match published feed"
                        );
                        continue;
                    }
                    other => other,
                }
            }
            HistoryStrategy::Xml | HistoryStrategy::Lenient => strategy.parse(&feed),
        };

        match records {
            Ok(records) => {
                tracing::debug!(
                    strategy = strategy.name(),
                    records = records.len(),
                    "Recovered feed history"
                );
                return records;
            }
            Err(e) => {
                tracing::warn!(strategy = strategy.name(), error = %e, "History strategy failed");
            }
        }
    }

    tracing::warn!(path = ?feed_path, "No history strategy succeeded, discarding history");
    Vec::new()
}

/// Timestamp of the first complete `<item>` in a feed document
fn newest_item_timestamp(feed: &str) -> Option<i64> {
    let start = feed.find("<item>")? + "<item>".len();
    let end = feed[start..].find("</item>")?;
    let block = &feed[start..start + end];
    tag_text(block, "guid")
        .as_deref()
        .and_then(timestamp_from_guid)
        .or_else(|| {
            tag_text(block, "pubDate")
                .as_deref()
                .and_then(parse_rss_date)
                .map(|p| p.timestamp())
        })
}

fn parse_sidecar(content: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
    let raw: RawSidecar = serde_json::from_str(content)?;
    if raw.version != SIDECAR_VERSION {
        return Err(HistoryError::UnsupportedVersion(raw.version));
    }

    let records = raw
        .records
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<HistoryRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed sidecar record");
                None
            }
        })
        .collect();

    Ok(records)
}

/// Item fields as they appear in the feed
#[derive(Debug, Default)]
struct RawItem {
    title: Option<String>,
    description: Option<String>,
    guid: Option<String>,
    pub_date: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum ItemField {
    Title,
    Description,
    Guid,
    PubDate,
}

impl RawItem {
    fn set(&mut self, field: ItemField, text: &str) {
        let slot = match field {
            ItemField::Title => &mut self.title,
            ItemField::Description => &mut self.description,
            ItemField::Guid => &mut self.guid,
            ItemField::PubDate => &mut self.pub_date,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    /// Recover a record; `None` when timestamp or price cannot be found
    fn into_record(self) -> Option<HistoryRecord> {
        let published = self.pub_date.as_deref().and_then(parse_rss_date);
        let timestamp = self
            .guid
            .as_deref()
            .and_then(timestamp_from_guid)
            .or_else(|| published.map(|p| p.timestamp()))?;
        let price = self
            .title
            .as_deref()
            .and_then(price_after_dollar)
            .or_else(|| self.description.as_deref().and_then(price_after_dollar))?;

        match published {
            Some(published) => Some(HistoryRecord {
                timestamp,
                price,
                published,
            }),
            None => HistoryRecord::at(timestamp, price),
        }
    }
}

/// `<base>/price/<timestamp>` → timestamp
fn timestamp_from_guid(guid: &str) -> Option<i64> {
    let (_, tail) = guid.trim().rsplit_once("/price/")?;
    tail.trim_end_matches('/').parse().ok()
}

/// First `$<amount>` in a text
fn price_after_dollar(text: &str) -> Option<rust_decimal::Decimal> {
    let (_, rest) = text.split_once('$')?;
    let amount: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    parse_price(amount.trim_end_matches('.'))
}

fn collect_items(items: Vec<RawItem>) -> Vec<HistoryRecord> {
    items
        .into_iter()
        .filter_map(|item| {
            let record = item.into_record();
            if record.is_none() {
                tracing::debug!("Skipping feed item without timestamp or price");
            }
            record
        })
        .collect()
}

fn parse_xml(content: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut field: Option<ItemField> = None;
    let mut depth = 0usize;
    let mut saw_rss = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                field = None;
                match e.name().as_ref() {
                    b"rss" => saw_rss = true,
                    b"item" => current = Some(RawItem::default()),
                    name if current.is_some() => {
                        field = match name {
                            b"title" => Some(ItemField::Title),
                            b"description" => Some(ItemField::Description),
                            b"guid" => Some(ItemField::Guid),
                            b"pubDate" => Some(ItemField::PubDate),
                            _ => None,
                        };
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                depth = depth.checked_sub(1).ok_or(HistoryError::Truncated)?;
                field = None;
                if e.name().as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    item.set(f, &t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    item.set(f, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(HistoryError::Truncated);
    }
    if !saw_rss {
        return Err(HistoryError::NotAFeed);
    }

    Ok(collect_items(items))
}

fn parse_lenient(content: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
    if !content.contains("<item") && !content.contains("<channel") {
        return Err(HistoryError::NotAFeed);
    }

    let mut items = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find("<item>") {
        let body = &rest[start + "<item>".len()..];
        let Some(end) = body.find("</item>") else {
            tracing::debug!("Dropping unterminated feed item");
            break;
        };
        let block = &body[..end];
        items.push(RawItem {
            title: tag_text(block, "title"),
            description: tag_text(block, "description"),
            guid: tag_text(block, "guid"),
            pub_date: tag_text(block, "pubDate"),
        });
        rest = &body[end + "</item>".len()..];
    }

    Ok(collect_items(items))
}

/// Inner text of the first `<tag ...>...</tag>` in `block`
fn tag_text(block: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut search = block;
    let inner_start = loop {
        let at = search.find(&open)?;
        let after = &search[at + open.len()..];
        // `<title` must not match `<titles>`
        match after.chars().next() {
            Some('>') | Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                let gt = after.find('>')?;
                break &after[gt + 1..];
            }
            _ => search = after,
        }
    };
    let end = inner_start.find(&close)?;
    let raw = inner_start[..end].trim();
    let raw = raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw);

    let text = quick_xml::escape::unescape(raw)
        .map(|t| t.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    Some(text)
}
