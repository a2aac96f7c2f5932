//! In-memory [`DocumentStore`] implementation for testing and embedding.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Structured queries are
//! evaluated with the shared in-memory predicate evaluator, so semantics
//! match the SQL translation exactly.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::filter::{FieldValue, Predicate, SortDirection};

use super::{DocumentStore, PageRequest, StoredEntity, StructuredQuery};

/// In-memory store backend.
pub struct MemoryStore<T> {
    docs: RwLock<HashMap<String, T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Order by `field` (missing values last), tie-break on id, then apply the
/// requested direction to the field comparison only.
fn sort_docs<T: StoredEntity>(docs: &mut [T], field: &str, direction: SortDirection) {
    docs.sort_by(|a, b| {
        let ordering = match (a.field(field), b.field(field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(va), Some(vb)) => {
                let cmp = va.compare(&vb).unwrap_or(Ordering::Equal);
                match direction {
                    SortDirection::Asc => cmp,
                    SortDirection::Desc => cmp.reverse(),
                }
            }
        };
        ordering.then_with(|| a.id().cmp(&b.id()))
    });
}

fn slice<T>(docs: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    docs.into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl<T: StoredEntity> DocumentStore<T> for MemoryStore<T> {
    async fn get(&self, id: &str) -> Result<Option<T>> {
        let docs = self.docs.read().unwrap();
        Ok(docs.get(id).cloned())
    }

    async fn save(&self, mut doc: T) -> Result<T> {
        if doc.id().is_none() {
            doc.set_id(Uuid::new_v4().to_string());
        }
        let id = doc.id().unwrap().to_string();
        let mut docs = self.docs.write().unwrap();
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        docs.remove(id);
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<T>> {
        let docs = self.docs.read().unwrap();
        Ok(docs.values().cloned().collect())
    }

    async fn find_by_field(
        &self,
        field: &str,
        value: FieldValue,
        page: Option<&PageRequest>,
    ) -> Result<Vec<T>> {
        let mut hits: Vec<T> = {
            let docs = self.docs.read().unwrap();
            docs.values()
                .filter(|doc| doc.field(field).as_ref() == Some(&value))
                .cloned()
                .collect()
        };

        match page {
            Some(req) => {
                sort_docs(&mut hits, &req.order_by, req.direction);
                Ok(slice(hits, req.offset(), req.limit()))
            }
            None => Ok(hits),
        }
    }

    async fn count_by_field(&self, field: &str, value: FieldValue) -> Result<u64> {
        let docs = self.docs.read().unwrap();
        Ok(docs
            .values()
            .filter(|doc| doc.field(field).as_ref() == Some(&value))
            .count() as u64)
    }

    async fn execute(&self, query: &StructuredQuery) -> Result<Vec<T>> {
        let mut hits: Vec<T> = {
            let docs = self.docs.read().unwrap();
            docs.values()
                .filter(|doc| match &query.predicate {
                    Some(p) => p.matches(*doc),
                    None => true,
                })
                .cloned()
                .collect()
        };

        sort_docs(&mut hits, &query.order_by, query.direction);
        Ok(slice(hits, query.offset, query.limit))
    }

    async fn count(&self, predicate: Option<&Predicate>) -> Result<u64> {
        let docs = self.docs.read().unwrap();
        Ok(docs
            .values()
            .filter(|doc| match predicate {
                Some(p) => p.matches(*doc),
                None => true,
            })
            .count() as u64)
    }
}
