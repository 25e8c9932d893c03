//! In-memory store implementation
//!
//! Suitable for single-process deployments and testing. For production use,
//! implement [`Store`] over the hosted database client.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::query::Query;
use crate::store::{Row, Store, StoreError, StoreResult};

/// In-memory store keyed by table name.
///
/// Rows keep insertion order. Rows carrying an `id` field must have a unique
/// id within their table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in `table`.
    pub async fn count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    /// Snapshot of every row in `table`.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let rows = tables.get(table).map(|rows| rows.iter().cloned());
        Ok(match rows {
            Some(rows) => query.apply(rows),
            None => Vec::new(),
        })
    }

    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(id) = row.get("id").filter(|id| !id.is_null()) {
            if rows.iter().any(|existing| existing.get("id") == Some(id)) {
                return Err(StoreError::Duplicate {
                    table: table.to_string(),
                    id: id.to_string(),
                });
            }
        }

        rows.push(row.clone());
        tracing::trace!(table, rows = rows.len(), "Inserted row");
        Ok(row)
    }

    async fn update(&self, table: &str, query: &Query, patch: Row) -> StoreResult<Vec<Row>> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| query.matches(r)) {
            for (key, value) in &patch {
                row.insert(key.clone(), value.clone());
            }
            updated.push(row.clone());
        }

        tracing::trace!(table, updated = updated.len(), "Updated rows");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use serde_json::{json, Value};

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_select() {
        let store = MemoryStore::new();
        store
            .insert("locations", row(json!({ "id": "a", "name": "Main" })))
            .await
            .unwrap();
        store
            .insert("locations", row(json!({ "id": "b", "name": "Annex" })))
            .await
            .unwrap();

        let rows = store
            .select("locations", &Query::new().order_by("name", Direction::Ascending))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("Annex"));
        assert_eq!(store.count("locations").await, 2);
    }

    #[tokio::test]
    async fn test_unknown_table_is_empty() {
        let store = MemoryStore::new();
        let rows = store.select("nothing", &Query::new()).await.unwrap();
        assert!(rows.is_empty());

        let one = store.select_one("nothing", &Query::new()).await.unwrap();
        assert!(one.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryStore::new();
        store.insert("roles", row(json!({ "id": "r1" }))).await.unwrap();

        let err = store
            .insert("roles", row(json!({ "id": "r1" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.count("roles").await, 1);
    }

    #[tokio::test]
    async fn test_update_acts_as_compare_and_set() {
        let store = MemoryStore::new();
        store
            .insert("organizations", row(json!({ "id": "o1", "version": 1 })))
            .await
            .unwrap();

        let cas = Query::new().eq("id", "o1").eq("version", 1);
        let patch = row(json!({ "version": 2, "parent_id": "p" }));

        let first = store.update("organizations", &cas, patch.clone()).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["parent_id"], json!("p"));

        // The version moved on, so the same filter no longer matches.
        let second = store.update("organizations", &cas, patch).await.unwrap();
        assert!(second.is_empty());
    }
}
