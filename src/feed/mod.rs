//! Feed module
//!
//! History recovery, merge and RSS/HTML rendering for the published price feed

pub mod format;
pub mod history;
pub mod render;
mod types;

pub use history::{encode_sidecar, read_history, HistoryStrategy, DEFAULT_STRATEGIES};
pub use render::{render, RenderError, RenderedFeed};
pub use types::{
    FeedDocument, FeedEntry, FeedMeta, HistoryRecord, FEED_FILE_NAME, HTML_FILE_NAME,
    SIDECAR_FILE_NAME,
};
