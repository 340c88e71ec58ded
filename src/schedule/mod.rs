//! Periodic job scheduling
//!
//! Runs a unit of work sequentially each time a [`Trigger`] fires. Job
//! failures are logged and never stop the loop.

mod trigger;

pub use trigger::{ChannelTrigger, CountedTrigger, IntervalTrigger, Trigger};

use async_trait::async_trait;
use std::fmt::Display;

/// A unit of work run on every trigger
#[async_trait]
pub trait Job: Send + Sync {
    /// Error reported by a failed run
    type Error: Display + Send;

    /// Run the job once
    async fn run(&self) -> Result<(), Self::Error>;
}

/// Outcome counts for a scheduler run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleStats {
    /// Runs that completed
    pub succeeded: u64,
    /// Runs that returned an error
    pub failed: u64,
}

impl ScheduleStats {
    /// Total runs
    pub fn runs(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Drives a [`Job`] from a [`Trigger`]
pub struct Scheduler<T> {
    trigger: T,
}

impl<T: Trigger> Scheduler<T> {
    /// Create a scheduler fired by `trigger`
    pub fn new(trigger: T) -> Self {
        Self { trigger }
    }

    /// Run `job` on every trigger until the trigger stops
    pub async fn run<J: Job>(mut self, job: &J) -> ScheduleStats {
        let mut stats = ScheduleStats::default();

        while self.trigger.next().await {
            match job.run().await {
                Ok(()) => stats.succeeded += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(error = %e, "Scheduled run failed, retrying next interval");
                }
            }
        }

        tracing::info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Scheduler stopped"
        );
        stats
    }
}
