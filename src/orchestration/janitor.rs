use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::debug;
use pingora_core::{server::ShutdownWatch, services::background::BackgroundService};
use tokio::time::interval;

use crate::{config, core::ExecutionTracker, service::metrics};

/// Periodically evicts expired and overflowing tracker records.
pub struct TrackerJanitor {
    tracker: Arc<ExecutionTracker>,
    retention: Duration,
    capacity: usize,
    sweep_interval: Duration,
}

impl TrackerJanitor {
    pub fn new(tracker: Arc<ExecutionTracker>, config: &config::Tracker) -> Self {
        Self {
            tracker,
            retention: Duration::from_secs(config.retention),
            capacity: config.capacity,
            sweep_interval: Duration::from_secs(config.sweep_interval),
        }
    }

    pub fn sweep(&self) -> usize {
        let evicted = self.tracker.evict(self.retention, self.capacity);
        metrics::set_tracked_executions(self.tracker.len());
        evicted
    }
}

#[async_trait]
impl BackgroundService for TrackerJanitor {
    async fn start(&self, mut shutdown: ShutdownWatch) {
        let mut ticker = interval(self.sweep_interval);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("Shutdown signal received, stopping tracker janitor");
                        return;
                    }
                },
                _ = ticker.tick() => {
                    self.sweep();
                }
            }
        }
    }
}
