// Handler contract - the caller-supplied function computing a mutation

use crate::domain::document::{Document, Modifier, Selector, UpdateOptions};
use crate::domain::error::DomainError;
use crate::domain::job::JobId;
use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Parsed handler key of the form `"<collection>.<name>"`.
///
/// The separator must appear at a non-leading position; the prefix names the
/// target collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerKey {
    pub collection: String,
    pub name: String,
}

impl HandlerKey {
    pub fn parse(key: &str) -> std::result::Result<Self, DomainError> {
        match key.find('.') {
            Some(idx) if idx > 0 => Ok(Self {
                collection: key[..idx].to_string(),
                name: key.to_string(),
            }),
            _ => Err(DomainError::InvalidHandlerFormat(key.to_string())),
        }
    }
}

/// Context passed to a handler alongside the target document and args.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Dispatch time, epoch ms
    pub now: i64,
    pub job_id: JobId,
}

/// Outcome computed by a handler.
///
/// Failure is not an outcome variant: handlers return `Err` through the
/// normal `Result` channel, which the dispatcher records as the job's
/// terminal failure.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// No mutation; the job still finalizes as done.
    Noop,
    /// Delete the target record matched by `{target_id} AND selector`.
    Delete { selector: Selector },
    /// Apply `modifier` to the target record matched by
    /// `{target_id} AND selector`.
    Update {
        selector: Selector,
        modifier: Modifier,
        options: UpdateOptions,
    },
}

impl HandlerOutcome {
    /// Update with no selector refinement and default options.
    pub fn update(modifier: Modifier) -> Self {
        HandlerOutcome::Update {
            selector: Selector::default(),
            modifier,
            options: UpdateOptions::default(),
        }
    }

    /// Delete with no selector refinement.
    pub fn delete() -> Self {
        HandlerOutcome::Delete {
            selector: Selector::default(),
        }
    }
}

/// Caller-supplied update handler.
///
/// Invoked with the current target document (None when it was deleted since
/// scheduling), the args captured at schedule time, and the dispatch context.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn run(
        &self,
        doc: Option<&Document>,
        args: &serde_json::Value,
        ctx: &HandlerContext,
    ) -> Result<HandlerOutcome>;
}

type HandlerFn = dyn for<'a> Fn(
        Option<&'a Document>,
        &'a serde_json::Value,
        &'a HandlerContext,
    ) -> BoxFuture<'a, Result<HandlerOutcome>>
    + Send
    + Sync;

/// Adapter turning an async closure into an `UpdateHandler`.
pub struct FnHandler {
    f: Box<HandlerFn>,
}

impl FnHandler {
    pub fn new<F>(f: F) -> Arc<Self>
    where
        F: for<'a> Fn(
                Option<&'a Document>,
                &'a serde_json::Value,
                &'a HandlerContext,
            ) -> BoxFuture<'a, Result<HandlerOutcome>>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self { f: Box::new(f) })
    }

    /// Wrap a synchronous function; the common case for pure handlers.
    pub fn sync<F>(f: F) -> Arc<Self>
    where
        F: Fn(Option<&Document>, &serde_json::Value, &HandlerContext) -> Result<HandlerOutcome>
            + Send
            + Sync
            + 'static,
    {
        Self::new(move |doc, args, ctx| {
            let result = f(doc, args, ctx);
            Box::pin(async move { result })
        })
    }
}

#[async_trait]
impl UpdateHandler for FnHandler {
    async fn run(
        &self,
        doc: Option<&Document>,
        args: &serde_json::Value,
        ctx: &HandlerContext,
    ) -> Result<HandlerOutcome> {
        (self.f)(doc, args, ctx).await
    }
}
