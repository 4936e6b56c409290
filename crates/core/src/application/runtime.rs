// Runtime surface - wiring and the public schedule/registration API

use crate::application::config::WorkerConfig;
use crate::application::dispatcher::Dispatcher;
use crate::application::enqueue::{self, ScheduleRequest};
use crate::application::registry::HandlerRegistry;
use crate::application::resolver::TargetResolver;
use crate::application::retention::RetentionSweeper;
use crate::application::worker::{default_worker_id, shutdown_channel, Poller, ShutdownSender};
use crate::domain::{DomainError, HandlerKey, JobId, UpdateHandler};
use crate::error::Result;
use crate::port::{IdProvider, JobStore, TimeProvider};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Cloneable handle for scheduling updates, returned by
/// `UpdateService::define_handlers`.
#[derive(Clone)]
pub struct Scheduler {
    job_store: Arc<dyn JobStore>,
    resolver: Arc<TargetResolver>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Schedule a handler to run against a record after a delay.
    ///
    /// Returns the new job's id. Fails synchronously on an invalid target
    /// id, a malformed handler key, or an unknown collection.
    pub async fn schedule_update(&self, req: ScheduleRequest) -> Result<JobId> {
        enqueue::execute(
            self.job_store.as_ref(),
            self.resolver.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            req,
        )
        .await
    }
}

/// Composition root for one worker process.
///
/// Owns the handler registry and target resolver and starts the poll loop
/// and retention sweeper on the first successful `define_handlers` call.
/// Configuration is a constructor argument, so it is necessarily in place
/// before the poller starts.
pub struct UpdateService {
    job_store: Arc<dyn JobStore>,
    resolver: Arc<TargetResolver>,
    registry: Arc<HandlerRegistry>,
    config: WorkerConfig,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    worker_id: String,
    shutdown: Mutex<Option<ShutdownSender>>,
}

impl UpdateService {
    pub fn new(
        job_store: Arc<dyn JobStore>,
        resolver: TargetResolver,
        config: WorkerConfig,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            job_store,
            resolver: Arc::new(resolver),
            registry: Arc::new(HandlerRegistry::new()),
            config,
            time_provider,
            id_provider,
            worker_id: default_worker_id(),
            shutdown: Mutex::new(None),
        }
    }

    /// Override the worker identity recorded on claimed jobs (one id per
    /// process replica is the intended deployment).
    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    /// Register a map of handlers and start the background loops.
    ///
    /// The whole map is validated for format and uniqueness before any
    /// entry is registered, so a rejected call leaves the registry exactly
    /// as it was. The poller and retention sweeper start once, on the first
    /// successful call. Returns a handle for scheduling updates against the
    /// registered handlers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn define_handlers(
        &self,
        handlers: HashMap<String, Arc<dyn UpdateHandler>>,
    ) -> Result<Scheduler> {
        for key in handlers.keys() {
            HandlerKey::parse(key)?;
            if self.registry.lookup(key).is_some() {
                return Err(DomainError::DuplicateHandler(key.clone()).into());
            }
        }
        for (key, handler) in handlers {
            self.registry.register(&key, handler)?;
        }
        self.boot();
        Ok(self.scheduler())
    }

    /// Handle for scheduling without registering further handlers
    pub fn scheduler(&self) -> Scheduler {
        Scheduler {
            job_store: self.job_store.clone(),
            resolver: self.resolver.clone(),
            id_provider: self.id_provider.clone(),
            time_provider: self.time_provider.clone(),
        }
    }

    fn boot(&self) {
        let mut shutdown = self.shutdown.lock().unwrap_or_else(|e| e.into_inner());
        if shutdown.is_some() {
            return;
        }
        let (tx, rx) = shutdown_channel();

        let dispatcher = Arc::new(Dispatcher::new(
            self.registry.clone(),
            self.resolver.clone(),
            self.job_store.clone(),
            self.time_provider.clone(),
        ));
        let poller = Poller::new(
            self.worker_id.clone(),
            self.job_store.clone(),
            dispatcher,
            self.config.clone(),
            self.time_provider.clone(),
        );
        let poller_token = rx.clone();
        tokio::spawn(async move { poller.run(poller_token).await });

        let sweeper = RetentionSweeper::new(
            self.job_store.clone(),
            self.config.clone(),
            self.time_provider.clone(),
        );
        tokio::spawn(async move { sweeper.run(rx).await });

        info!(worker_id = %self.worker_id, "Update service booted");
        *shutdown = Some(tx);
    }

    /// Signal the background loops to stop
    pub fn shutdown(&self) {
        let mut guard = self.shutdown.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.take() {
            tx.shutdown();
        }
    }
}

impl Drop for UpdateService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::handler::FnHandler;
    use crate::domain::{DomainError, Document, HandlerOutcome, JobStatus, Modifier};
    use crate::error::AppError;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_store::mocks::MemoryJobStore;
    use crate::port::target_collection::mocks::MemoryCollection;
    use crate::port::time_provider::SystemTimeProvider;
    use crate::port::TargetCollection;
    use serde_json::json;
    use std::time::Duration;

    fn service_with(
        collection: Arc<MemoryCollection>,
        store: Arc<MemoryJobStore>,
    ) -> UpdateService {
        let mut map: HashMap<String, Arc<dyn TargetCollection>> = HashMap::new();
        map.insert("posts".to_string(), collection);
        UpdateService::new(
            store,
            TargetResolver::new(map),
            WorkerConfig {
                poll_ms: 10,
                ..WorkerConfig::development()
            },
            Arc::new(SystemTimeProvider),
            Arc::new(SequentialIdProvider::new()),
        )
    }

    fn handler_map(
        entries: Vec<(&str, Arc<dyn UpdateHandler>)>,
    ) -> HashMap<String, Arc<dyn UpdateHandler>> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[tokio::test]
    async fn define_handlers_rejects_invalid_names() {
        let service = service_with(
            Arc::new(MemoryCollection::new()),
            Arc::new(MemoryJobStore::new()),
        );
        let err = service
            .define_handlers(handler_map(vec![(
                "invalidname",
                FnHandler::sync(|_, _, _| Ok(HandlerOutcome::Noop)) as Arc<dyn UpdateHandler>,
            )]))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidHandlerFormat(_))
        ));
    }

    #[tokio::test]
    async fn rejected_map_registers_nothing() {
        let service = service_with(
            Arc::new(MemoryCollection::new()),
            Arc::new(MemoryJobStore::new()),
        );
        let err = service
            .define_handlers(handler_map(vec![
                (
                    "posts.good",
                    FnHandler::sync(|_, _, _| Ok(HandlerOutcome::Noop)) as Arc<dyn UpdateHandler>,
                ),
                (
                    "invalidname",
                    FnHandler::sync(|_, _, _| Ok(HandlerOutcome::Noop)) as Arc<dyn UpdateHandler>,
                ),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidHandlerFormat(_))
        ));

        // The valid key from the rejected map was not registered either
        service
            .define_handlers(handler_map(vec![(
                "posts.good",
                FnHandler::sync(|_, _, _| Ok(HandlerOutcome::Noop)) as Arc<dyn UpdateHandler>,
            )]))
            .unwrap();
        service.shutdown();
    }

    #[tokio::test]
    async fn schedule_and_process_end_to_end() {
        let collection = Arc::new(MemoryCollection::new());
        let store = Arc::new(MemoryJobStore::new());
        let mut doc = Document::new();
        doc.insert("name".to_string(), json!("test"));
        collection.insert("p1", doc).await.unwrap();

        let service = service_with(collection.clone(), store.clone());
        let scheduler = service
            .define_handlers(handler_map(vec![(
                "posts.process",
                FnHandler::sync(|_, _, _| {
                    let mut fields = Document::new();
                    fields.insert("status".to_string(), json!("processed"));
                    Ok(HandlerOutcome::update(Modifier::set_fields(fields)))
                }) as Arc<dyn UpdateHandler>,
            )]))
            .unwrap();

        let job_id = scheduler
            .schedule_update(ScheduleRequest {
                target_id: "p1".to_string(),
                delay_seconds: 0,
                handler: "posts.process".to_string(),
                args: serde_json::Value::Null,
            })
            .await
            .unwrap();

        // Wait for the poller to pick the job up
        let mut done = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let job = store.find_by_id(&job_id).await.unwrap().unwrap();
            if job.status == JobStatus::Done {
                done = true;
                break;
            }
        }
        assert!(done, "job should complete");

        let record = collection.find_by_id("p1").await.unwrap().unwrap();
        assert_eq!(record.get("status"), Some(&json!("processed")));
        service.shutdown();
    }

    #[tokio::test]
    async fn registration_is_one_shot_per_key() {
        let service = service_with(
            Arc::new(MemoryCollection::new()),
            Arc::new(MemoryJobStore::new()),
        );
        service
            .define_handlers(handler_map(vec![(
                "posts.touch",
                FnHandler::sync(|_, _, _| Ok(HandlerOutcome::Noop)) as Arc<dyn UpdateHandler>,
            )]))
            .unwrap();
        let err = service
            .define_handlers(handler_map(vec![(
                "posts.touch",
                FnHandler::sync(|_, _, _| Ok(HandlerOutcome::Noop)) as Arc<dyn UpdateHandler>,
            )]))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::DuplicateHandler(_))
        ));
        service.shutdown();
    }
}
