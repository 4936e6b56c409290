// Job Domain Model - the schedulable unit of work

use serde::{Deserialize, Serialize};

/// Job ID (UUID v4)
pub type JobId = String;

/// Job status. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// Job Entity
///
/// All timestamps are epoch milliseconds, injected via `TimeProvider`.
/// `attempts` only ever increases, and only through a successful claim.
/// While `leased_until` is set and in the future the job is exclusively
/// owned by `worker_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub target_collection: String,
    pub target_id: String,
    /// Handler key of the form "<collection>.<name>"
    pub handler: String,
    /// Opaque payload passed to the handler, caller-defined shape
    pub args: serde_json::Value,
    /// Timestamp before which the job must not be claimed
    pub due_at: i64,
    pub status: JobStatus,
    pub attempts: i32,
    pub leased_until: Option<i64>,
    pub worker_id: Option<String>,
    /// Set only on terminal failure
    pub last_error: Option<String>,
    pub created_at: i64,
}

impl Job {
    /// Create a new queued job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `target_collection` - Logical name of the collection owning the target
    /// * `target_id` - Identifier of the record to mutate
    /// * `handler` - Handler key, already validated by the caller
    /// * `args` - Handler payload
    /// * `due_at` - When the job becomes claimable
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        target_collection: impl Into<String>,
        target_id: impl Into<String>,
        handler: impl Into<String>,
        args: serde_json::Value,
        due_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            target_collection: target_collection.into(),
            target_id: target_id.into(),
            handler: handler.into(),
            args,
            due_at,
            status: JobStatus::Queued,
            attempts: 0,
            leased_until: None,
            worker_id: None,
            last_error: None,
            created_at,
        }
    }

    /// Create a test job with deterministic ID and timestamps.
    ///
    /// Uses a simple counter for deterministic test IDs (test-1, test-2, ...).
    /// Timestamps start at 1000 and increment by 1000; `due_at` equals
    /// `created_at` so the job is immediately due.
    ///
    /// **Note**: This method should only be used in tests. For production code,
    /// always inject ID and time via providers.
    pub fn new_test(
        target_collection: impl Into<String>,
        target_id: impl Into<String>,
        handler: impl Into<String>,
    ) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let id = format!("test-{}", counter);
        let created_at = (counter * 1000) as i64;

        Self::new(
            id,
            created_at,
            target_collection,
            target_id,
            handler,
            serde_json::Value::Null,
            created_at,
        )
    }
}
