// Target Resolver - logical collection name to live collection handle

use crate::domain::DomainError;
use crate::error::Result;
use crate::port::TargetCollection;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps logical collection names to live collection handles.
///
/// Built whole from a complete map (replacement semantics, not additive)
/// and injected into the enqueuer and dispatcher; no ambient global state.
pub struct TargetResolver {
    collections: HashMap<String, Arc<dyn TargetCollection>>,
}

impl TargetResolver {
    pub fn new(collections: HashMap<String, Arc<dyn TargetCollection>>) -> Self {
        Self { collections }
    }

    /// Resolve a collection handle, failing with `UnknownCollection`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn TargetCollection>> {
        self.collections
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::UnknownCollection(name.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::port::target_collection::mocks::MemoryCollection;

    #[test]
    fn resolves_registered_collections() {
        let mut map: HashMap<String, Arc<dyn TargetCollection>> = HashMap::new();
        map.insert("posts".to_string(), Arc::new(MemoryCollection::new()));
        let resolver = TargetResolver::new(map);

        assert!(resolver.resolve("posts").is_ok());
        let err = resolver.resolve("comments").unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::UnknownCollection(name)) if name == "comments"
        ));
    }
}
