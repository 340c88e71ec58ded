//! Scheduler triggers

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Decides when the next job run starts
#[async_trait]
pub trait Trigger: Send {
    /// Wait for the next run; `false` stops the scheduler
    async fn next(&mut self) -> bool;
}

/// Fires immediately, then once per period
///
/// A run that overshoots the period delays the next tick instead of
/// bursting to catch up, so runs never pile up.
pub struct IntervalTrigger {
    interval: Interval,
}

impl IntervalTrigger {
    /// Create a trigger with the given period
    ///
    /// # Panics
    /// Panics if `period` is zero.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Period between runs
    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl Trigger for IntervalTrigger {
    async fn next(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Fires a fixed number of times without waiting
#[derive(Debug, Clone)]
pub struct CountedTrigger {
    remaining: usize,
}

impl CountedTrigger {
    /// Fire `count` times, then stop
    pub fn new(count: usize) -> Self {
        Self { remaining: count }
    }
}

#[async_trait]
impl Trigger for CountedTrigger {
    async fn next(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Fires whenever a message arrives; stops when every sender is dropped
pub struct ChannelTrigger {
    rx: mpsc::Receiver<()>,
}

impl ChannelTrigger {
    /// Create a trigger and the handle that fires it
    pub fn new(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl Trigger for ChannelTrigger {
    async fn next(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counted_trigger() {
        let mut trigger = CountedTrigger::new(2);
        assert!(trigger.next().await);
        assert!(trigger.next().await);
        assert!(!trigger.next().await);
        assert!(!trigger.next().await);
    }

    #[tokio::test]
    async fn test_channel_trigger_stops_when_senders_drop() {
        let (tx, mut trigger) = ChannelTrigger::new(4);
        tx.send(()).await.unwrap();
        assert!(trigger.next().await);
        drop(tx);
        assert!(!trigger.next().await);
    }

    #[tokio::test]
    async fn test_interval_trigger_first_tick_is_immediate() {
        let mut trigger = IntervalTrigger::new(Duration::from_secs(3600));
        assert_eq!(trigger.period(), Duration::from_secs(3600));
        let fired = tokio::time::timeout(Duration::from_secs(1), trigger.next()).await;
        assert_eq!(fired.ok(), Some(true));
    }
}
