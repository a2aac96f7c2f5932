//! Core data models: collections, conversations, file details, and paged
//! results. Timestamps are epoch milliseconds.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::filter::{FieldSource, FieldValue};
use crate::store::StoredEntity;

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A named, checksum-tracked grouping of uploaded files.
///
/// `lowercase_name` is derived from `name` and globally unique across all
/// collections. `files` maps file id to the content checksum captured when
/// the file was added (a point-in-time snapshot, never recomputed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub lowercase_name: String,
    #[serde(default)]
    pub files: HashMap<String, String>,
    pub owner_id: String,
    #[serde(default)]
    pub shared: bool,
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        files: HashMap<String, String>,
        owner_id: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let lowercase_name = name.to_lowercase();
        Self {
            id: None,
            name,
            lowercase_name,
            files,
            owner_id: owner_id.into(),
            shared: false,
            created_at: now_millis(),
            updated_at: None,
        }
    }
}

impl FieldSource for Collection {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "owner_id" => Some(FieldValue::str(self.owner_id.clone())),
            "name" => Some(FieldValue::str(self.name.clone())),
            "lowercase_name" => Some(FieldValue::str(self.lowercase_name.clone())),
            "shared" => Some(FieldValue::Bool(self.shared)),
            "created_at" => Some(FieldValue::Int(self.created_at)),
            "updated_at" => self.updated_at.map(FieldValue::Int),
            _ => None,
        }
    }
}

impl StoredEntity for Collection {
    const KIND: &'static str = "collections";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// Role of a conversation history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A single conversation history entry. System entries are synthesized by
/// the engine to record collection add/remove/visibility events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rephrased: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>, rephrased: Option<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            rephrased,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            rephrased: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            rephrased: None,
        }
    }
}

/// A per-user chat session: append-only history plus the ordered,
/// duplicate-free list of collection ids currently in scope.
///
/// `collections` holds weak references — no back-pointer exists on the
/// collection side, and staleness after a delete or visibility change is
/// repaired by the reference cascade rather than enforced by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub id: Option<String>,
    pub owner_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub history: Vec<Message>,
    pub updated_at: i64,
}

impl Conversation {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            id: None,
            owner_id: owner_id.into(),
            title: None,
            collections: Vec::new(),
            history: Vec::new(),
            updated_at: now_millis(),
        }
    }
}

impl FieldSource for Conversation {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "owner_id" => Some(FieldValue::str(self.owner_id.clone())),
            "title" => self.title.clone().map(FieldValue::Str),
            "updated_at" => Some(FieldValue::Int(self.updated_at)),
            _ => None,
        }
    }
}

impl StoredEntity for Conversation {
    const KIND: &'static str = "conversations";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// Display record for a stored file, mapped from blob metadata.
#[derive(Debug, Clone, Serialize)]
pub struct FileDetails {
    /// Stored blob name within the owner's namespace.
    pub name: String,
    /// Original filename with the generated unique prefix stripped.
    pub original_name: String,
    pub date_uploaded: i64,
    pub size_in_bytes: i64,
    pub size_readable: String,
    pub checksum: String,
    pub metadata: HashMap<String, String>,
}

/// One page of a filtered listing.
///
/// `total_elements` always reflects the full filtered set, independently of
/// the page slice.
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_elements: u64,
    pub size: u32,
    pub page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total_elements: u64, size: u32, page: u32) -> Self {
        Self {
            items,
            total_elements,
            size,
            page,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            0
        } else {
            self.total_elements.div_ceil(self.size as u64)
        }
    }
}

/// A collection page plus the resolved file details for every collection on
/// it. The file attachment is an enrichment: resolution failures degrade to
/// an empty list instead of failing the listing.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionPage {
    #[serde(flatten)]
    pub page: PagedResult<Collection>,
    pub files: Vec<FileDetails>,
}
