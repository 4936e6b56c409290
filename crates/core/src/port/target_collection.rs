// Target Collection Port (Interface)

use crate::domain::{Document, Modifier, Selector, UpdateOptions};
use crate::error::Result;
use async_trait::async_trait;

/// A live, mutable record collection (the target of scheduled mutations).
///
/// Every mutation is scoped by the record id first; the selector only
/// narrows the match further. Update and delete return the number of
/// records affected (0 or 1 under id scoping).
#[async_trait]
pub trait TargetCollection: Send + Sync {
    /// Fetch the current record, if any
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>>;

    /// Insert a record under `id` (used for seeding and upserts)
    async fn insert(&self, id: &str, doc: Document) -> Result<()>;

    /// Apply `modifier` to the record matched by `{id} AND selector`.
    ///
    /// With `options.upsert` and no existing record, inserts a fresh
    /// document built from the selector's equality fields with the modifier
    /// applied. A selector mismatch on an existing record affects nothing.
    async fn update(
        &self,
        id: &str,
        selector: &Selector,
        modifier: &Modifier,
        options: &UpdateOptions,
    ) -> Result<u64>;

    /// Delete the record matched by `{id} AND selector`
    async fn delete(&self, id: &str, selector: &Selector) -> Result<u64>;
}

impl std::fmt::Debug for dyn TargetCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn TargetCollection")
    }
}

/// Build the document an upsert inserts when no record matches: the
/// selector's equality fields with the modifier applied on top.
pub fn upsert_document(selector: &Selector, modifier: &Modifier) -> Document {
    let mut doc = selector.0.clone();
    modifier.apply(&mut doc);
    doc
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory target collection for unit tests
    pub struct MemoryCollection {
        records: Mutex<HashMap<String, Document>>,
    }

    impl MemoryCollection {
        pub fn new() -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
            }
        }

        pub fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl Default for MemoryCollection {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl TargetCollection for MemoryCollection {
        async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
            Ok(self.records.lock().unwrap().get(id).cloned())
        }

        async fn insert(&self, id: &str, doc: Document) -> Result<()> {
            self.records.lock().unwrap().insert(id.to_string(), doc);
            Ok(())
        }

        async fn update(
            &self,
            id: &str,
            selector: &Selector,
            modifier: &Modifier,
            options: &UpdateOptions,
        ) -> Result<u64> {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(id) {
                Some(doc) if selector.matches(doc) => {
                    modifier.apply(doc);
                    Ok(1)
                }
                Some(_) => Ok(0),
                None if options.upsert => {
                    records.insert(id.to_string(), upsert_document(selector, modifier));
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        async fn delete(&self, id: &str, selector: &Selector) -> Result<u64> {
            let mut records = self.records.lock().unwrap();
            match records.get(id) {
                Some(doc) if selector.matches(doc) => {
                    records.remove(id);
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

}
