//! Blob store abstraction.
//!
//! The engine never talks to an object store directly; it consumes the
//! [`BlobStore`] trait, which exposes the only capabilities cloud buckets
//! reliably offer: prefix listing, existence checks, and per-object
//! metadata reads. There is no structured query capability — callers that
//! need filtering do it in memory over the listing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::now_millis;

/// Metadata for a single stored blob.
#[derive(Debug, Clone)]
pub struct BlobObject {
    /// Full object name, e.g. `users/u1/<uuid>-report.pdf`.
    pub name: String,
    pub size: i64,
    /// Creation timestamp, epoch millis.
    pub created_at: i64,
    /// Last update timestamp, epoch millis. Absent for never-rewritten blobs.
    pub updated_at: Option<i64>,
    /// Content checksum as reported by the store.
    pub checksum: String,
    /// User-supplied metadata entries (`status`, `keywords`, ...).
    pub metadata: HashMap<String, String>,
}

/// Abstract blob store backend.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// List all blobs whose name starts with `prefix`, sorted by name.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>>;

    /// Whether a blob exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Metadata for the blob at `path`, if present.
    async fn get(&self, path: &str) -> Result<Option<BlobObject>>;

    /// Remove the blob at `path`. Returns whether anything was removed.
    async fn remove(&self, path: &str) -> Result<bool>;
}

/// Shared handle to a blob store backend.
pub type SharedBlobStore = Arc<dyn BlobStore>;

/// In-memory blob store for testing and embedding.
///
/// Checksums are hex-encoded SHA-256 of the content, mirroring what a real
/// object store reports alongside each object.
pub struct MemoryBlobStore {
    objects: RwLock<Vec<BlobObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(Vec::new()),
        }
    }

    /// Store a blob, replacing any existing object with the same name.
    pub fn put(&self, name: &str, content: &[u8], metadata: HashMap<String, String>) -> BlobObject {
        let object = BlobObject {
            name: name.to_string(),
            size: content.len() as i64,
            created_at: now_millis(),
            updated_at: None,
            checksum: hex::encode(Sha256::digest(content)),
            metadata,
        };
        let mut objects = self.objects.write().unwrap();
        objects.retain(|o| o.name != name);
        objects.push(object.clone());
        object
    }

    /// Replace a stored object wholesale (tests use this to pin timestamps).
    pub fn put_object(&self, object: BlobObject) {
        let mut objects = self.objects.write().unwrap();
        objects.retain(|o| o.name != object.name);
        objects.push(object);
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>> {
        let objects = self.objects.read().unwrap();
        let mut hits: Vec<BlobObject> = objects
            .iter()
            .filter(|o| o.name.starts_with(prefix))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hits)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let objects = self.objects.read().unwrap();
        Ok(objects.iter().any(|o| o.name == path))
    }

    async fn get(&self, path: &str) -> Result<Option<BlobObject>> {
        let objects = self.objects.read().unwrap();
        Ok(objects.iter().find(|o| o.name == path).cloned())
    }

    async fn remove(&self, path: &str) -> Result<bool> {
        let mut objects = self.objects.write().unwrap();
        let before = objects.len();
        objects.retain(|o| o.name != path);
        Ok(objects.len() < before)
    }
}
