// Retention sweeps over the SQLite store: age by created_at, ignore status

use deferq_core::application::retention::RetentionSweeper;
use deferq_core::application::WorkerConfig;
use deferq_core::domain::{Job, JobStatus};
use deferq_core::port::time_provider::mocks::FixedTimeProvider;
use deferq_core::port::JobStore;
use deferq_sqlite::{create_pool, run_migrations, SqliteJobStore};
use std::sync::Arc;

const DAY_MS: i64 = 86_400_000;

async fn store() -> Arc<SqliteJobStore> {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqliteJobStore::new(pool))
}

fn job_created_at(id: &str, created_at: i64, status: JobStatus) -> Job {
    let mut job = Job::new(
        id,
        created_at,
        "posts",
        format!("target-{}", id),
        "posts.archive",
        serde_json::Value::Null,
        created_at,
    );
    job.status = status;
    job
}

#[tokio::test]
async fn sweep_purges_expired_jobs_of_every_status() {
    let store = store().await;
    let now = 100 * DAY_MS;
    let clock = Arc::new(FixedTimeProvider::new(now));
    let config = WorkerConfig::default(); // retention_days: 7

    let expired = [
        job_created_at("old-done", now - 8 * DAY_MS, JobStatus::Done),
        job_created_at("old-failed", now - 9 * DAY_MS, JobStatus::Failed),
        job_created_at("old-queued", now - 30 * DAY_MS, JobStatus::Queued),
    ];
    let kept = [
        job_created_at("fresh-done", now - 6 * DAY_MS, JobStatus::Done),
        job_created_at("fresh-queued", now - DAY_MS, JobStatus::Queued),
    ];
    for job in expired.iter().chain(kept.iter()) {
        store.insert(job).await.unwrap();
    }

    let sweeper = RetentionSweeper::new(store.clone(), config, clock);
    assert_eq!(sweeper.run_now().await.unwrap(), 3);

    for job in &expired {
        assert!(store.find_by_id(&job.id).await.unwrap().is_none());
    }
    for job in &kept {
        assert!(store.find_by_id(&job.id).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn sweep_is_idempotent_and_honors_configured_window() {
    let store = store().await;
    let now = 100 * DAY_MS;
    let clock = Arc::new(FixedTimeProvider::new(now));
    let config = WorkerConfig {
        retention_days: 2,
        ..WorkerConfig::default()
    };

    store
        .insert(&job_created_at("borderline", now - 2 * DAY_MS - 1, JobStatus::Done))
        .await
        .unwrap();
    store
        .insert(&job_created_at("inside", now - 2 * DAY_MS + 1, JobStatus::Done))
        .await
        .unwrap();

    let sweeper = RetentionSweeper::new(store.clone(), config, clock.clone());
    assert_eq!(sweeper.run_now().await.unwrap(), 1);
    assert_eq!(sweeper.run_now().await.unwrap(), 0);

    assert!(store.find_by_id(&"borderline".to_string()).await.unwrap().is_none());
    assert!(store.find_by_id(&"inside".to_string()).await.unwrap().is_some());
}

#[tokio::test]
async fn advancing_the_clock_ages_jobs_out() {
    let store = store().await;
    let start = 100 * DAY_MS;
    let clock = Arc::new(FixedTimeProvider::new(start));
    let config = WorkerConfig::default();

    store
        .insert(&job_created_at("j1", start - DAY_MS, JobStatus::Done))
        .await
        .unwrap();

    let sweeper = RetentionSweeper::new(store.clone(), config, clock.clone());
    assert_eq!(sweeper.run_now().await.unwrap(), 0);

    clock.advance(7 * DAY_MS);
    assert_eq!(sweeper.run_now().await.unwrap(), 1);
    assert!(store.find_by_id(&"j1".to_string()).await.unwrap().is_none());
}
