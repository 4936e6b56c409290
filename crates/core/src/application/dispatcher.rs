// Dispatcher - runs a claimed job's handler and applies its outcome

use crate::application::registry::HandlerRegistry;
use crate::application::resolver::TargetResolver;
use crate::domain::{DomainError, HandlerContext, HandlerOutcome, Job};
use crate::error::Result;
use crate::port::{JobStore, TimeProvider};
use std::sync::Arc;
use tracing::{error, info};

/// Executes claimed jobs: resolves the handler and target, invokes the
/// handler, applies the resulting mutation, and finalizes job status.
///
/// Every execution error is caught here and recorded on the job as a
/// terminal failure; nothing propagates to the poll loop. Retry, when it
/// happens, only occurs through lease-expiry reclaiming of jobs whose
/// worker crashed before finalizing.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    resolver: Arc<TargetResolver>,
    job_store: Arc<dyn JobStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        resolver: Arc<TargetResolver>,
        job_store: Arc<dyn JobStore>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            registry,
            resolver,
            job_store,
            time_provider,
        }
    }

    /// Run `job` to completion and finalize it as done or failed.
    ///
    /// Finalization is a plain update; the lease claimed for this job makes
    /// it exclusively ours. A finalize error is logged best-effort and the
    /// job stays `processing` until its lease expires.
    pub async fn dispatch(&self, job: &Job) {
        match self.run_job(job).await {
            Ok(()) => {
                if let Err(e) = self.job_store.mark_done(&job.id).await {
                    error!(job_id = %job.id, error = %e, "Failed to finalize job as done");
                    return;
                }
                info!(job_id = %job.id, handler = %job.handler, "Job completed");
            }
            Err(e) => {
                let message = e.to_string();
                error!(
                    job_id = %job.id,
                    handler = %job.handler,
                    error = %message,
                    "Job failed"
                );
                if let Err(e) = self.job_store.mark_failed(&job.id, &message).await {
                    error!(job_id = %job.id, error = %e, "Failed to finalize job as failed");
                }
            }
        }
    }

    async fn run_job(&self, job: &Job) -> Result<()> {
        let handler = self
            .registry
            .lookup(&job.handler)
            .ok_or_else(|| DomainError::MissingHandler(job.handler.clone()))?;

        // Re-checked defensively; the enqueuer already validated this
        let collection = self.resolver.resolve(&job.target_collection)?;

        // May be absent: the target can have been deleted since scheduling
        let doc = collection.find_by_id(&job.target_id).await?;

        let ctx = HandlerContext {
            now: self.time_provider.now_millis(),
            job_id: job.id.clone(),
        };
        let outcome = handler.run(doc.as_ref(), &job.args, &ctx).await?;

        match outcome {
            HandlerOutcome::Noop => Ok(()),
            HandlerOutcome::Delete { selector } => {
                collection.delete(&job.target_id, &selector).await?;
                Ok(())
            }
            HandlerOutcome::Update {
                selector,
                modifier,
                options,
            } => {
                if modifier.is_empty() {
                    return Err(DomainError::ModifierRequired.into());
                }
                collection
                    .update(&job.target_id, &selector, &modifier, &options)
                    .await?;
                Ok(())
            }
        }
    }
}
