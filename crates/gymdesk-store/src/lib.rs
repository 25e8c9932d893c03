//! # Gymdesk Store
//!
//! This crate defines the data-store contract consumed by the Gymdesk core
//! crates. The hosted relational database is reached through a small, generic
//! query interface; this crate describes that interface and ships an
//! in-memory backend for single-process use and testing.
//!
//! ## Overview
//!
//! The gymdesk-store crate handles:
//! - **Rows**: Loosely-typed JSON rows exchanged with the backend
//! - **Queries**: Equality, inequality and membership filters, ordering,
//!   limit and offset
//! - **Store**: Async select, insert and update primitives
//! - **Codec**: Helpers converting typed records to and from rows
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gymdesk_store::{Direction, MemoryStore, Query, Store};
//! use serde_json::json;
//!
//! async fn example() {
//!     let store = MemoryStore::new();
//!
//!     let row = json!({ "id": "org-1", "name": "Downtown Gym" });
//!     store.insert("organizations", row.as_object().unwrap().clone()).await.unwrap();
//!
//!     let query = Query::new()
//!         .eq("name", "Downtown Gym")
//!         .order_by("name", Direction::Ascending);
//!     let rows = store.select("organizations", &query).await.unwrap();
//!     assert_eq!(rows.len(), 1);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `memory` (default): In-memory backend

#[cfg(feature = "memory")]
pub mod memory;
pub mod query;
pub mod store;

// Re-export main types for convenience
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use query::{Direction, Filter, Order, Query};
pub use store::{from_row, from_rows, to_row, Row, Store, StoreError, StoreResult};
