use crate::cache::MarketCache;
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Background task refreshing the marketplace cache at a fixed period.
///
/// The first refresh runs immediately. The task is stopped when the handle is dropped.
#[derive(Debug)]
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Spawns the refresh task on the current runtime.
    pub fn spawn(cache: MarketCache, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Err(err) = cache.refresh().await {
                    warn!(target: "market::refresh", %err, "periodic refresh failed");
                }
            }
        });
        debug!(target: "market::refresh", ?period, "started marketplace refresh");
        Self { task }
    }

    /// Stops the refresh task.
    pub fn shutdown(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        debug!(target: "market::refresh", "stopping marketplace refresh");
        self.task.abort();
    }
}
