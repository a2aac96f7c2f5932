//! Document store abstraction.
//!
//! The [`DocumentStore`] trait defines every storage operation the engine
//! needs over a schemaless document store: point reads/writes plus a
//! structured-query executor that accepts the shared predicate tree.
//! Backends must be `Send + Sync` to work with async runtimes.
//!
//! The store is the engine's only shared mutable resource. There are no
//! multi-document transactions; per-document save is the sole serialization
//! point, so concurrent writers to one document are last-write-wins.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`get`](DocumentStore::get) | Point read by id |
//! | [`save`](DocumentStore::save) | Insert (assigning an id) or replace |
//! | [`delete`](DocumentStore::delete) | Remove by id |
//! | [`find_all`](DocumentStore::find_all) | Full scan |
//! | [`find_by_field`](DocumentStore::find_by_field) | Equality scan, optionally paged |
//! | [`count_by_field`](DocumentStore::count_by_field) | Equality count |
//! | [`execute`](DocumentStore::execute) | Predicate + order + offset/limit |
//! | [`count`](DocumentStore::count) | Independent count for the same predicate |

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::filter::{FieldSource, FieldValue, Predicate, SortDirection};

/// A document type the store can persist.
///
/// `KIND` is the storage namespace (one logical collection of documents per
/// entity type). Ids are store-assigned on first save.
pub trait StoredEntity:
    FieldSource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: &'static str;

    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: String);
}

/// Page slice parameters for [`DocumentStore::find_by_field`].
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub order_by: String,
    pub direction: SortDirection,
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(order_by: impl Into<String>, direction: SortDirection, page: u32, size: u32) -> Self {
        Self {
            order_by: order_by.into(),
            direction,
            page,
            size,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }

    pub fn limit(&self) -> u64 {
        self.size as u64
    }
}

/// A filtered, ordered, offset/limit query.
///
/// Ordering places documents missing the order field last, then breaks ties
/// by id for deterministic pagination across backends.
#[derive(Debug, Clone)]
pub struct StructuredQuery {
    pub predicate: Option<Predicate>,
    pub order_by: String,
    pub direction: SortDirection,
    pub offset: u64,
    pub limit: u64,
}

/// Abstract document store backend.
///
/// All operations are async; in-memory implementations return
/// immediately-ready futures.
#[async_trait]
pub trait DocumentStore<T: StoredEntity>: Send + Sync {
    /// Point read. `Ok(None)` when absent.
    async fn get(&self, id: &str) -> Result<Option<T>>;

    /// Insert or replace. Assigns a fresh id when the document has none and
    /// returns the persisted document.
    async fn save(&self, doc: T) -> Result<T>;

    /// Remove by id. Removing an absent document is not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Full scan of the namespace.
    async fn find_all(&self) -> Result<Vec<T>>;

    /// Equality scan over one field, optionally sorted and paged.
    async fn find_by_field(
        &self,
        field: &str,
        value: FieldValue,
        page: Option<&PageRequest>,
    ) -> Result<Vec<T>>;

    /// Count of documents matching one field equality.
    async fn count_by_field(&self, field: &str, value: FieldValue) -> Result<u64>;

    /// Execute a structured query: filter, order, offset, limit.
    async fn execute(&self, query: &StructuredQuery) -> Result<Vec<T>>;

    /// Total count for a predicate, independent of any page slice.
    async fn count(&self, predicate: Option<&Predicate>) -> Result<u64>;
}

/// Shared handle to a store backend.
pub type SharedStore<T> = Arc<dyn DocumentStore<T>>;
