// Retention Sweeper - age out job records regardless of status

use crate::application::config::WorkerConfig;
use crate::application::worker::ShutdownToken;
use crate::error::Result;
use crate::port::{JobStore, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Sweep period; retention is day-granular so hourly is plenty
const SWEEP_PERIOD: Duration = Duration::from_secs(3600);

/// Deletes job records a fixed duration after `created_at`, independent of
/// status. The store-side counterpart of a TTL index: terminal and stuck
/// jobs alike age out of the table.
pub struct RetentionSweeper {
    job_store: Arc<dyn JobStore>,
    config: WorkerConfig,
    time_provider: Arc<dyn TimeProvider>,
}

impl RetentionSweeper {
    pub fn new(
        job_store: Arc<dyn JobStore>,
        config: WorkerConfig,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            job_store,
            config,
            time_provider,
        }
    }

    /// Run the sweep loop (background task)
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            retention_days = self.config.retention_days,
            "Retention sweeper started"
        );
        let mut tick = interval(SWEEP_PERIOD);
        // The immediate first tick doubles as a startup sweep
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => {
                    info!("Retention sweeper shutting down");
                    break;
                }
            }
            if shutdown.is_shutdown() {
                break;
            }
            if let Err(e) = self.run_now().await {
                error!(error = %e, "Retention sweep failed");
            }
        }
    }

    /// Run one sweep immediately (for manual trigger and tests)
    pub async fn run_now(&self) -> Result<u64> {
        let cutoff = self.time_provider.now_millis() - self.config.retention_ms();
        let purged = self.job_store.purge_created_before(cutoff).await?;
        if purged > 0 {
            info!(purged_jobs = purged, cutoff = cutoff, "Retention sweep completed");
        }
        Ok(purged)
    }
}
