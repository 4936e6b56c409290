// Schedule Use Case - validate a request and insert a queued job

use crate::application::resolver::TargetResolver;
use crate::domain::{DomainError, HandlerKey, Job};
use crate::error::Result;
use crate::port::{IdProvider, JobStore, TimeProvider};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Schedule request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub target_id: String,
    pub delay_seconds: i64,
    pub handler: String,

    #[serde(default)]
    pub args: serde_json::Value,
}

/// Execute the schedule use case.
///
/// Validates the target id and handler key, verifies the collection
/// resolves, then inserts a queued job due `delay_seconds` from now and
/// returns its id.
pub async fn execute(
    job_store: &dyn JobStore,
    resolver: &TargetResolver,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: ScheduleRequest,
) -> Result<String> {
    if req.target_id.is_empty() {
        return Err(DomainError::InvalidTargetId.into());
    }
    let key = HandlerKey::parse(&req.handler)?;
    resolver.resolve(&key.collection)?;

    let now = time_provider.now_millis();
    let due_at = now + req.delay_seconds * 1000;
    let job_id = id_provider.generate_id();

    let job = Job::new(
        job_id.clone(),
        now,
        key.collection,
        req.target_id,
        req.handler,
        req.args,
        due_at,
    );
    job_store.insert(&job).await?;

    info!(
        job_id = %job_id,
        handler = %job.handler,
        due_at = due_at,
        "Scheduled update job"
    );

    Ok(job_id)
}
