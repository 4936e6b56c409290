// Poller - per-process claim/dispatch loop

mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::config::WorkerConfig;
use crate::application::dispatcher::Dispatcher;
use crate::error::Result;
use crate::port::{ClaimRequest, JobStore, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Build the default worker identity recorded on claimed jobs
pub fn default_worker_id() -> String {
    format!("deferq:{}", std::process::id())
}

/// Recurring poll loop: once per tick, attempt to claim a single due job
/// and run it to completion before the next tick.
///
/// One job in flight per process; concurrency across jobs comes from
/// running multiple processes against the same store. A tick failure is
/// logged and never stops the loop.
pub struct Poller {
    worker_id: String,
    job_store: Arc<dyn JobStore>,
    dispatcher: Arc<Dispatcher>,
    config: WorkerConfig,
    time_provider: Arc<dyn TimeProvider>,
}

impl Poller {
    pub fn new(
        worker_id: impl Into<String>,
        job_store: Arc<dyn JobStore>,
        dispatcher: Arc<Dispatcher>,
        config: WorkerConfig,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            job_store,
            dispatcher,
            config,
            time_provider,
        }
    }

    /// Run the poll loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            worker_id = %self.worker_id,
            poll_ms = self.config.poll_ms,
            "Poller started"
        );
        let mut tick = tokio::time::interval(Duration::from_millis(self.config.poll_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => {
                    info!(worker_id = %self.worker_id, "Poller shutting down");
                    break;
                }
            }
            if shutdown.is_shutdown() {
                info!(worker_id = %self.worker_id, "Poller shutting down");
                break;
            }
            // Claim errors must not stop the timer
            if let Err(e) = self.poll_once().await {
                error!(worker_id = %self.worker_id, error = %e, "Poll tick failed");
            }
        }
        info!(worker_id = %self.worker_id, "Poller stopped");
    }

    /// One tick: claim at most one due job and dispatch it.
    ///
    /// Returns whether a job was processed. Dispatch itself never errors
    /// (execution failures are finalized on the job); an `Err` here means
    /// the claim call against the store failed.
    pub async fn poll_once(&self) -> Result<bool> {
        let claim = ClaimRequest {
            worker_id: self.worker_id.clone(),
            now: self.time_provider.now_millis(),
            lease_ms: self.config.lease_ms(),
            max_attempts: self.config.max_attempts,
        };
        let job = match self.job_store.claim_next(&claim).await? {
            Some(job) => job,
            None => return Ok(false),
        };

        info!(
            job_id = %job.id,
            handler = %job.handler,
            attempt = job.attempts,
            "Claimed job"
        );
        self.dispatcher.dispatch(&job).await;
        Ok(true)
    }
}
