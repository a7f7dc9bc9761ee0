//! Background refresher: periodically forces a model cache refresh so the ranked list stays
//! current while no inference calls arrive.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model_cache::ModelCache;

/// Default interval for scheduled refreshes.
pub const DAILY_REFRESH: Duration = Duration::from_secs(24 * 60 * 60);

/// Spawns a task that forces [`ModelCache::refresh`] every `interval`.
pub struct CacheRefresher {
    cache: ModelCache,
    interval: Duration,
}

impl CacheRefresher {
    pub fn new(cache: ModelCache, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub fn daily(cache: ModelCache) -> Self {
        Self::new(cache, DAILY_REFRESH)
    }

    /// Spawn the refresh loop. The first tick fires immediately. Abort via the handle.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match self.cache.refresh().await {
                    Ok(models) => debug!(count = models.len(), "scheduled model cache refresh done"),
                    Err(e) => warn!(error = %e, "scheduled model cache refresh failed"),
                }
            }
        })
    }
}
