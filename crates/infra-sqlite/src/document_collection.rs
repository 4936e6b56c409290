// SQLite TargetCollection Implementation
//
// Target records live in a shared `records` table keyed by
// (collection, id), each row holding one JSON document. Selector matching
// and modifier application are domain logic; this adapter only supplies
// the transactional read-modify-write around them.

use crate::job_store::map_sqlx_error;
use async_trait::async_trait;
use deferq_core::domain::{Document, Modifier, Selector, UpdateOptions};
use deferq_core::error::{AppError, Result};
use deferq_core::port::target_collection::{upsert_document, TargetCollection};
use sqlx::SqlitePool;

pub struct SqliteCollection {
    pool: SqlitePool,
    name: String,
}

impl SqliteCollection {
    pub fn new(pool: SqlitePool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn parse_doc(raw: &str) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    value
        .as_object()
        .cloned()
        .ok_or_else(|| AppError::Database("record is not a JSON object".to_string()))
}

#[async_trait]
impl TargetCollection for SqliteCollection {
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT doc FROM records WHERE collection = ? AND id = ?")
                .bind(&self.name)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        raw.as_deref().map(parse_doc).transpose()
    }

    async fn insert(&self, id: &str, doc: Document) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO records (collection, id, doc) VALUES (?, ?, ?)")
            .bind(&self.name)
            .bind(id)
            .bind(serde_json::Value::Object(doc).to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        selector: &Selector,
        modifier: &Modifier,
        options: &UpdateOptions,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let raw: Option<String> =
            sqlx::query_scalar("SELECT doc FROM records WHERE collection = ? AND id = ?")
                .bind(&self.name)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        let affected = match raw {
            Some(raw) => {
                let mut doc = parse_doc(&raw)?;
                if !selector.matches(&doc) {
                    0
                } else {
                    modifier.apply(&mut doc);
                    sqlx::query("UPDATE records SET doc = ? WHERE collection = ? AND id = ?")
                        .bind(serde_json::Value::Object(doc).to_string())
                        .bind(&self.name)
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?;
                    1
                }
            }
            None if options.upsert => {
                let doc = upsert_document(selector, modifier);
                sqlx::query("INSERT INTO records (collection, id, doc) VALUES (?, ?, ?)")
                    .bind(&self.name)
                    .bind(id)
                    .bind(serde_json::Value::Object(doc).to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
                1
            }
            None => 0,
        };

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(affected)
    }

    async fn delete(&self, id: &str, selector: &Selector) -> Result<u64> {
        // No selector refinement: a single statement suffices
        if selector.is_empty() {
            let result = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
                .bind(&self.name)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            return Ok(result.rows_affected());
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let raw: Option<String> =
            sqlx::query_scalar("SELECT doc FROM records WHERE collection = ? AND id = ?")
                .bind(&self.name)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        let affected = match raw {
            Some(raw) if selector.matches(&parse_doc(&raw)?) => {
                sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
                    .bind(&self.name)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
                1
            }
            _ => 0,
        };

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(affected)
    }
}
