//! Feed merge and rendering
//!
//! Merges the newest observation with prior history into a bounded,
//! newest-first [`FeedDocument`], then serializes it as RSS 2.0 and as an
//! HTML summary of the latest price.

use super::format::{format_display_time, format_price, format_rss_date};
use super::types::{FeedDocument, FeedEntry, FeedMeta, HistoryRecord, FEED_FILE_NAME};
use crate::price::PriceObservation;
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const RSS_DOCS: &str = "https://www.rssboard.org/rss-specification";
const GENERATOR: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// The XML writer rejected an event
    #[error("XML serialization failed: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Everything one cycle publishes
#[derive(Debug, Clone)]
pub struct RenderedFeed {
    /// Merged document
    pub document: FeedDocument,
    /// RSS 2.0 bytes
    pub rss: Vec<u8>,
    /// HTML summary page
    pub html: String,
}

impl RenderedFeed {
    /// Records to persist as structured history
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.document.records()
    }
}

/// Build the syndication entry for one record
pub fn entry_for(record: &HistoryRecord, meta: &FeedMeta) -> FeedEntry {
    let amount = format_price(record.price);
    FeedEntry {
        id: format!("{}/price/{}", meta.link, record.timestamp),
        title: format!("Bitcoin Price: ${}", amount),
        link: meta.link.clone(),
        description: format!(
            "The current price of Bitcoin is ${} USD as of {}",
            amount,
            format_display_time(record.published)
        ),
        published: record.published,
        record: record.clone(),
    }
}

/// Merge the new observation ahead of prior history
///
/// The result holds the new entry first, then at most `max_entries - 1`
/// history entries sorted newest first. Equal timestamps (clock anomalies)
/// are kept as they are.
pub fn build_document(
    observation: &PriceObservation,
    mut history: Vec<HistoryRecord>,
    max_entries: usize,
    meta: &FeedMeta,
    built_at: DateTime<Utc>,
) -> FeedDocument {
    let max_entries = max_entries.max(1);
    let newest = HistoryRecord::from(observation);

    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    history.truncate(max_entries - 1);

    let entries = std::iter::once(&newest)
        .chain(history.iter())
        .map(|r| entry_for(r, meta))
        .collect();

    FeedDocument {
        meta: meta.clone(),
        entries,
        built_at,
    }
}

/// Serialize a document as RSS 2.0
pub fn render_rss(doc: &FeedDocument) -> Result<Vec<u8>, RenderError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", ATOM_NS));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    let meta = &doc.meta;
    text_element(&mut writer, "title", &meta.title)?;
    text_element(&mut writer, "link", &meta.link)?;
    text_element(&mut writer, "description", &meta.subtitle)?;
    writer
        .create_element("atom:link")
        .with_attribute(("href", meta.self_link.as_str()))
        .with_attribute(("rel", "self"))
        .with_attribute(("type", "application/rss+xml"))
        .write_empty()?;
    text_element(&mut writer, "atom:id", &meta.id)?;
    text_element(&mut writer, "docs", RSS_DOCS)?;
    text_element(&mut writer, "generator", GENERATOR)?;
    text_element(&mut writer, "language", &meta.language)?;
    text_element(&mut writer, "lastBuildDate", &format_rss_date(doc.built_at))?;

    for entry in &doc.entries {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &entry.title)?;
        text_element(&mut writer, "link", &entry.link)?;
        text_element(&mut writer, "description", &entry.description)?;
        writer
            .create_element("guid")
            .with_attribute(("isPermaLink", "false"))
            .write_text_content(BytesText::new(&entry.id))?;
        text_element(&mut writer, "pubDate", &format_rss_date(entry.published))?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), RenderError> {
    writer
        .create_element(name)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

/// Render the HTML summary
///
/// Only the newest entry is shown; history lives in the feed.
pub fn render_html(doc: &FeedDocument) -> String {
    let (price, updated) = match doc.latest() {
        Some(entry) => (
            format!("${} USD", format_price(entry.record.price)),
            format_display_time(entry.published),
        ),
        None => ("unavailable".to_string(), format_display_time(doc.built_at)),
    };
    let title = escape(doc.meta.page_title.as_str());

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <link rel="alternate" type="application/rss+xml" title="{title}" href="{feed}">
    <style>
        body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 2em auto; padding: 0 1em; }}
        h1 {{ color: #333; }}
        .price {{ font-size: 1.2em; margin: 1em 0; }}
        .updated {{ color: #666; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p class="price">Current Bitcoin Price: {price}</p>
    <p class="updated">Last updated: {updated}</p>
    <p><a href="{feed}">View RSS Feed</a></p>
</body>
</html>
"#,
        lang = escape(doc.meta.language.as_str()),
        title = title,
        feed = FEED_FILE_NAME,
        price = escape(price.as_str()),
        updated = updated,
    )
}

/// Merge and render in one step
pub fn render(
    observation: &PriceObservation,
    history: Vec<HistoryRecord>,
    max_entries: usize,
    meta: &FeedMeta,
) -> Result<RenderedFeed, RenderError> {
    let document = build_document(observation, history, max_entries, meta, Utc::now());
    let rss = render_rss(&document)?;
    let html = render_html(&document);

    Ok(RenderedFeed {
        document,
        rss,
        html,
    })
}
