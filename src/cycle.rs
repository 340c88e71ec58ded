//! One fetch → history → render → publish cycle

use crate::feed::{self, FeedMeta, RenderError};
use crate::price::{FetchError, PriceObservation, PriceSource};
use crate::publish::{Artifacts, PublishError, Publisher};
use crate::schedule::Job;
use crate::telemetry::{self, CycleOutcome};
use async_trait::async_trait;
use std::time::Instant;
use thiserror::Error;

/// Reasons a cycle is abandoned
///
/// Unreadable history is not among them: it only discards history.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Price could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Feed could not be rendered
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Artifacts could not be written
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl CycleError {
    fn outcome(&self) -> CycleOutcome {
        match self {
            CycleError::Fetch(_) => CycleOutcome::FetchFailed,
            CycleError::Render(_) | CycleError::Publish(_) => CycleOutcome::PublishFailed,
        }
    }
}

/// Result of a successful cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Observation that was published
    pub observation: PriceObservation,
    /// History records recovered from storage
    pub history_len: usize,
    /// Entries in the published feed
    pub entries: usize,
}

/// Fetches, merges and publishes the price feed
pub struct FeedCycle<S> {
    source: S,
    publisher: Publisher,
    meta: FeedMeta,
    max_entries: usize,
}

impl<S: PriceSource> FeedCycle<S> {
    /// Create a cycle publishing through `publisher`
    pub fn new(source: S, publisher: Publisher, meta: FeedMeta, max_entries: usize) -> Self {
        Self {
            source,
            publisher,
            meta,
            max_entries: max_entries.max(1),
        }
    }

    /// Publisher in use
    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Run a single cycle
    pub async fn run_once(&self) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        let result = self.execute().await;

        let outcome = match &result {
            Ok(report) => {
                telemetry::set_last_price(report.observation.price);
                CycleOutcome::Published
            }
            Err(e) => e.outcome(),
        };
        telemetry::record_cycle(outcome, started.elapsed());

        result
    }

    async fn execute(&self) -> Result<CycleReport, CycleError> {
        let observation = self.source.fetch().await?;
        tracing::debug!(price = %observation.price, timestamp = observation.timestamp, "Fetched price");

        let history = feed::read_history(&self.publisher.feed_path()).await;
        let history_len = history.len();

        let rendered = feed::render(&observation, history, self.max_entries, &self.meta)?;
        let artifacts = Artifacts::from_rendered(&rendered)?;
        self.publisher.publish(&artifacts).await?;

        let entries = rendered.document.len();
        tracing::info!(
            price = %feed::format::format_price(observation.price),
            entries,
            history = history_len,
            dir = ?self.publisher.target_dir(),
            "Published price feed"
        );

        Ok(CycleReport {
            observation,
            history_len,
            entries,
        })
    }
}

#[async_trait]
impl<S: PriceSource> Job for FeedCycle<S> {
    type Error = CycleError;

    async fn run(&self) -> Result<(), CycleError> {
        self.run_once().await.map(|_| ())
    }
}
