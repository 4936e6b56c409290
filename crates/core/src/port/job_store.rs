// Job Store Port (Interface)

use crate::domain::{Job, JobId, JobStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Parameters for one atomic claim attempt.
///
/// `now` is injected by the caller so claim eligibility is deterministic in
/// tests; the store computes the new lease as `now + lease_ms`.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub worker_id: String,
    pub now: i64,
    pub lease_ms: i64,
    pub max_attempts: i32,
}

/// Persistence interface for Job records.
///
/// `claim_next` is the only operation with a concurrency-correctness
/// requirement: it must be a single indivisible conditional
/// read-modify-write so that no two concurrent callers are handed the same
/// job for the same attempt. Everything else is a plain read or update,
/// safe because a claimed job is exclusively owned via its lease.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job
    async fn insert(&self, job: &Job) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;

    /// Atomically claim the next eligible job, or None when nothing is due.
    ///
    /// Eligibility at `claim.now`:
    /// - queued, due, and not under an active lease, or
    /// - processing with an expired lease (abandoned by a crashed worker),
    /// - and in either case `attempts < max_attempts`.
    ///
    /// Ordered by smallest `due_at`, ties broken by smallest `created_at`.
    /// On success the returned job is `processing` with the lease, worker id
    /// and incremented attempt count already applied.
    async fn claim_next(&self, claim: &ClaimRequest) -> Result<Option<Job>>;

    /// Finalize a job as done and release its lease
    async fn mark_done(&self, id: &JobId) -> Result<()>;

    /// Finalize a job as failed, recording the error and releasing the lease
    async fn mark_failed(&self, id: &JobId, error: &str) -> Result<()>;

    /// Count jobs by status
    async fn count_by_status(&self, status: JobStatus) -> Result<i64>;

    /// Delete jobs created before `cutoff`, regardless of status (retention)
    async fn purge_created_before(&self, cutoff: i64) -> Result<u64>;
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory job store for unit tests.
    ///
    /// Claim selection follows the same eligibility predicate and ordering
    /// as the SQLite adapter, but under a single process-wide mutex rather
    /// than database atomicity.
    pub struct MemoryJobStore {
        jobs: Mutex<HashMap<JobId, Job>>,
    }

    impl MemoryJobStore {
        pub fn new() -> Self {
            Self {
                jobs: Mutex::new(HashMap::new()),
            }
        }
    }

    impl Default for MemoryJobStore {
        fn default() -> Self {
            Self::new()
        }
    }

    fn eligible(job: &Job, claim: &ClaimRequest) -> bool {
        if job.attempts >= claim.max_attempts {
            return false;
        }
        let lease_expired = job.leased_until.map_or(true, |l| l <= claim.now);
        match job.status {
            JobStatus::Queued => job.due_at <= claim.now && lease_expired,
            JobStatus::Processing => job.leased_until.is_some_and(|l| l <= claim.now),
            JobStatus::Done | JobStatus::Failed => false,
        }
    }

    #[async_trait]
    impl JobStore for MemoryJobStore {
        async fn insert(&self, job: &Job) -> Result<()> {
            self.jobs
                .lock()
                .unwrap()
                .insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
            Ok(self.jobs.lock().unwrap().get(id).cloned())
        }

        async fn claim_next(&self, claim: &ClaimRequest) -> Result<Option<Job>> {
            let mut jobs = self.jobs.lock().unwrap();
            let next_id = jobs
                .values()
                .filter(|job| eligible(job, claim))
                .min_by_key(|job| (job.due_at, job.created_at, job.id.clone()))
                .map(|job| job.id.clone());

            match next_id {
                Some(id) => {
                    let job = jobs.get_mut(&id).unwrap();
                    job.status = JobStatus::Processing;
                    job.leased_until = Some(claim.now + claim.lease_ms);
                    job.worker_id = Some(claim.worker_id.clone());
                    job.attempts += 1;
                    Ok(Some(job.clone()))
                }
                None => Ok(None),
            }
        }

        async fn mark_done(&self, id: &JobId) -> Result<()> {
            if let Some(job) = self.jobs.lock().unwrap().get_mut(id) {
                job.status = JobStatus::Done;
                job.leased_until = None;
            }
            Ok(())
        }

        async fn mark_failed(&self, id: &JobId, error: &str) -> Result<()> {
            if let Some(job) = self.jobs.lock().unwrap().get_mut(id) {
                job.status = JobStatus::Failed;
                job.last_error = Some(error.to_string());
                job.leased_until = None;
            }
            Ok(())
        }

        async fn count_by_status(&self, status: JobStatus) -> Result<i64> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|job| job.status == status)
                .count() as i64)
        }

        async fn purge_created_before(&self, cutoff: i64) -> Result<u64> {
            let mut jobs = self.jobs.lock().unwrap();
            let before = jobs.len();
            jobs.retain(|_, job| job.created_at >= cutoff);
            Ok((before - jobs.len()) as u64)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn claim(now: i64) -> ClaimRequest {
            ClaimRequest {
                worker_id: "w1".to_string(),
                now,
                lease_ms: 15_000,
                max_attempts: 5,
            }
        }

        #[tokio::test]
        async fn claim_orders_by_due_then_created() {
            let store = MemoryJobStore::new();
            let mut early = Job::new_test("c", "t1", "c.h");
            early.due_at = 100;
            let mut late = Job::new_test("c", "t2", "c.h");
            late.due_at = 200;
            store.insert(&late).await.unwrap();
            store.insert(&early).await.unwrap();

            let claimed = store.claim_next(&claim(1000)).await.unwrap().unwrap();
            assert_eq!(claimed.id, early.id);
            assert_eq!(claimed.status, JobStatus::Processing);
            assert_eq!(claimed.attempts, 1);
        }

        #[tokio::test]
        async fn future_jobs_are_not_claimable() {
            let store = MemoryJobStore::new();
            let mut job = Job::new_test("c", "t", "c.h");
            job.due_at = 5_000;
            store.insert(&job).await.unwrap();

            assert!(store.claim_next(&claim(1_000)).await.unwrap().is_none());
            assert!(store.claim_next(&claim(5_000)).await.unwrap().is_some());
        }

        #[tokio::test]
        async fn attempts_ceiling_blocks_reclaim() {
            let store = MemoryJobStore::new();
            let mut job = Job::new_test("c", "t", "c.h");
            job.due_at = 0;
            job.attempts = 5;
            store.insert(&job).await.unwrap();

            assert!(store.claim_next(&claim(1_000)).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn expired_lease_allows_reclaim_of_processing_job() {
            let store = MemoryJobStore::new();
            let mut job = Job::new_test("c", "t", "c.h");
            job.due_at = 0;
            store.insert(&job).await.unwrap();

            let first = store.claim_next(&claim(1_000)).await.unwrap().unwrap();
            assert_eq!(first.attempts, 1);
            // Lease still active
            assert!(store.claim_next(&claim(2_000)).await.unwrap().is_none());
            // Lease expired
            let second = store.claim_next(&claim(20_000)).await.unwrap().unwrap();
            assert_eq!(second.id, first.id);
            assert_eq!(second.attempts, 2);
        }
    }
}
