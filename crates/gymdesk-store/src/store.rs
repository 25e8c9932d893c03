//! Store abstraction
//!
//! This module provides the [`Store`] trait every backend implements, the
//! error type its primitives return, and the row codec used by the typed
//! repositories in the other crates.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::query::Query;

/// A loosely-typed row as exchanged with the backend.
pub type Row = Map<String, Value>;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed the request
    #[error("Backend error: {0}")]
    Backend(String),

    /// A row could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Insert collided with an existing primary key
    #[error("Duplicate key in {table}: {id}")]
    Duplicate { table: String, id: String },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Data-store trait for the generic query interface.
///
/// Each primitive maps to one request against the backend. Implementations
/// must apply `update` atomically per call so that filters on a version
/// column act as a compare-and-set.
#[async_trait]
pub trait Store: Send + Sync {
    /// Select every row of `table` matching `query`.
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>>;

    /// Select at most one row of `table` matching `query`.
    async fn select_one(&self, table: &str, query: &Query) -> StoreResult<Option<Row>> {
        let query = query.clone().limit(1);
        Ok(self.select(table, &query).await?.into_iter().next())
    }

    /// Insert a row and return it as stored.
    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row>;

    /// Merge `patch` into every row matching the filters of `query`.
    ///
    /// Returns the updated rows; an empty result means nothing matched.
    async fn update(&self, table: &str, query: &Query, patch: Row) -> StoreResult<Vec<Row>>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        (**self).select(table, query).await
    }

    async fn select_one(&self, table: &str, query: &Query) -> StoreResult<Option<Row>> {
        (**self).select_one(table, query).await
    }

    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row> {
        (**self).insert(table, row).await
    }

    async fn update(&self, table: &str, query: &Query, patch: Row) -> StoreResult<Vec<Row>> {
        (**self).update(table, query, patch).await
    }
}

/// Encode a record as a row. The record must serialize to a JSON object.
pub fn to_row<T: Serialize>(record: &T) -> StoreResult<Row> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Serialization(format!(
            "expected object, got {}",
            other
        ))),
        Err(e) => Err(StoreError::Serialization(e.to_string())),
    }
}

/// Decode a row into a record.
pub fn from_row<T: DeserializeOwned>(row: Row) -> StoreResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode a batch of rows, failing on the first bad row.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}
