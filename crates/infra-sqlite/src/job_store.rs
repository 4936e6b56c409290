// SQLite JobStore Implementation

use async_trait::async_trait;
use deferq_core::domain::{Job, JobId, JobStatus};
use deferq_core::error::{AppError, Result};
use deferq_core::port::{ClaimRequest, JobStore};
use sqlx::SqlitePool;

// Helper to convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => AppError::Database(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "5" => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        _ => AppError::Database(err.to_string()),
    }
}

pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, target_collection, target_id, handler, args,
                due_at, status, attempts, leased_until, worker_id,
                last_error, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.target_collection)
        .bind(&job.target_id)
        .bind(&job.handler)
        .bind(job.args.to_string())
        .bind(job.due_at)
        .bind(job.status.to_string())
        .bind(job.attempts)
        .bind(job.leased_until)
        .bind(&job.worker_id)
        .bind(&job.last_error)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn claim_next(&self, claim: &ClaimRequest) -> Result<Option<Job>> {
        // The whole claim protocol is this one statement. SQLite executes it
        // as a single write transaction, so no two connections can both
        // match the same row: the inner SELECT and the UPDATE are
        // indivisible.
        let lease_until = claim.now + claim.lease_ms;
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET status = 'processing',
                leased_until = ?,
                worker_id = ?,
                attempts = attempts + 1
            WHERE id = (
                SELECT j.id FROM jobs j
                WHERE (
                        (j.status = 'queued' AND j.due_at <= ?
                            AND (j.leased_until IS NULL OR j.leased_until <= ?))
                     OR (j.status = 'processing' AND j.leased_until <= ?)
                      )
                  AND j.attempts < ?
                ORDER BY j.due_at ASC, j.created_at ASC, j.id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(lease_until)
        .bind(&claim.worker_id)
        .bind(claim.now)
        .bind(claim.now)
        .bind(claim.now)
        .bind(claim.max_attempts)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn mark_done(&self, id: &JobId) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'done', leased_until = NULL
            WHERE id = ?
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn mark_failed(&self, id: &JobId, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed', last_error = ?, leased_until = NULL
            WHERE id = ?
            "#,
        )
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = ?")
            .bind(status.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn purge_created_before(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jobs WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    target_collection: String,
    target_id: String,
    handler: String,
    args: String,
    due_at: i64,
    status: String,
    attempts: i32,
    leased_until: Option<i64>,
    worker_id: Option<String>,
    last_error: Option<String>,
    created_at: i64,
}

impl JobRow {
    /// Errors on a corrupt row rather than coercing it into a valid job.
    fn into_job(self) -> Result<Job> {
        let status = self.status.parse().map_err(AppError::Database)?;
        let args = serde_json::from_str(&self.args)?;

        Ok(Job {
            id: self.id,
            target_collection: self.target_collection,
            target_id: self.target_id,
            handler: self.handler,
            args,
            due_at: self.due_at,
            status,
            attempts: self.attempts,
            leased_until: self.leased_until,
            worker_id: self.worker_id,
            last_error: self.last_error,
            created_at: self.created_at,
        })
    }
}
