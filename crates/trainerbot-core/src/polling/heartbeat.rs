//! Liveness tracking and the periodic heartbeat log.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Counters the update loop writes and the heartbeat reads.
#[derive(Debug)]
pub struct Liveness {
    started: Instant,
    /// Milliseconds after `started` at which the last update was handled.
    last_activity_ms: AtomicU64,
    active_chats: AtomicUsize,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            active_chats: AtomicUsize::new(0),
        }
    }

    pub fn record_activity(&self) {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_activity_ms.store(elapsed, Ordering::Relaxed);
    }

    pub fn set_active_chats(&self, count: usize) {
        self.active_chats.store(count, Ordering::Relaxed);
    }

    pub fn active_chats(&self) -> usize {
        self.active_chats.load(Ordering::Relaxed)
    }

    /// Time since the last handled update (or since start if none).
    pub fn last_activity_ago(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.started.elapsed().saturating_sub(last)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Heartbeat;

impl Heartbeat {
    /// Spawn a task logging liveness every `interval` until `cancel` fires.
    ///
    /// Runs independently of polling, so a long poll never delays it.
    pub fn spawn(
        liveness: Arc<Liveness>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        info!(
                            active_chats = liveness.active_chats(),
                            last_activity_ago_secs = liveness.last_activity_ago().as_secs(),
                            "heartbeat"
                        );
                    }
                }
            }
        })
    }
}
