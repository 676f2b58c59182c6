use std::sync::Arc;

use tokio::time::{ interval, sleep, Duration, MissedTickBehavior };
use tokio_util::sync::CancellationToken;

use crate::config::StatusConfig;
use crate::services::StatusService;

/// Background loop that keeps the status snapshot fresh.
///
/// Refreshes on every interval tick and whenever an early refresh is
/// requested. A failed cycle waits `retry_backoff` before the loop listens
/// again. Cancelling the token stops the loop between cycles.
pub struct Scheduler {
    status: Arc<StatusService>,
    refresh_interval: Duration,
    retry_backoff: Duration,
    stop: CancellationToken,
}

impl Scheduler {
    pub fn new(status: Arc<StatusService>, config: &StatusConfig, stop: CancellationToken) -> Self {
        Self {
            status,
            refresh_interval: config.refresh_interval,
            retry_backoff: config.retry_backoff,
            stop,
        }
    }

    pub async fn start(self) {
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Status scheduler started, refreshing every {:?}", self.refresh_interval);

        while !self.stop.is_cancelled() {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = ticker.tick() => {}
                _ = self.status.refresh_requested() => {
                    tracing::debug!("Early status refresh requested");
                }
            }

            if self.status.refresh_now().await {
                continue;
            }

            tracing::warn!("Status refresh failed, retrying in {:?}", self.retry_backoff);
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = sleep(self.retry_backoff) => {}
            }
            ticker.reset_immediately();
        }

        tracing::info!("Status scheduler stopped");
    }
}
