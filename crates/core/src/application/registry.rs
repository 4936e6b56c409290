// Handler Registry - validated map from handler key to handler

use crate::domain::{DomainError, HandlerKey, UpdateHandler};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of update handlers, keyed by `"<collection>.<name>"`.
///
/// An explicit object threaded through constructors rather than a
/// process-wide map. Registration is one-shot per key for the process
/// lifetime; there is no unregister. Interior locking lets registration
/// happen after the registry has been shared with the worker.
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn UpdateHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler under `key`.
    ///
    /// Fails with `InvalidHandlerFormat` on a malformed key and
    /// `DuplicateHandler` when the key is already taken.
    pub fn register(&self, key: &str, handler: Arc<dyn UpdateHandler>) -> Result<()> {
        HandlerKey::parse(key)?;
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| crate::error::AppError::Internal("handler registry poisoned".into()))?;
        if handlers.contains_key(key) {
            return Err(DomainError::DuplicateHandler(key.to_string()).into());
        }
        handlers.insert(key.to_string(), handler);
        Ok(())
    }

    /// Look up a handler; absence is the dispatcher's `MissingHandler` case.
    pub fn lookup(&self, key: &str) -> Option<Arc<dyn UpdateHandler>> {
        self.handlers.read().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
