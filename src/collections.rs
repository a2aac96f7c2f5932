//! Collection lifecycle: creation, file membership, visibility, deletion,
//! and paged listings with file enrichment.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::files::FileService;
use crate::filter::{
    and_all, date_predicate, CollectionState, DateComparator, FieldValue, Predicate, SortDirection,
};
use crate::models::{now_millis, Collection, CollectionPage, FileDetails, PagedResult};
use crate::propagate::{CascadeEvent, ReferenceCascade};
use crate::store::{PageRequest, SharedStore, StructuredQuery};

pub const OWNER_FIELD: &str = "owner_id";
pub const SHARED_FIELD: &str = "shared";
pub const CREATED_AT_FIELD: &str = "created_at";
pub const LOWERCASE_NAME_FIELD: &str = "lowercase_name";

/// Filter parameters for the collection listing.
///
/// On the public path the owner scope comes from `target_id` (all public
/// collections when unset) and visibility is forced to shared; otherwise
/// the caller's own id scopes the query and `state` decides whether
/// `shared` is additionally required or forbidden.
#[derive(Debug, Clone, Default)]
pub struct CollectionQuery {
    pub public_path: bool,
    pub target_id: Option<String>,
    pub q: Option<String>,
    pub date: Option<NaiveDate>,
    pub date_cmp: DateComparator,
    pub state: CollectionState,
    pub direction: SortDirection,
    pub page: u32,
    pub size: u32,
}

impl CollectionQuery {
    /// Build the composite predicate for this query. `None` means no
    /// filter beyond the entity kind (match all).
    pub fn predicate(&self, user_id: &str) -> Option<Predicate> {
        let mut filters = Vec::new();

        let owner_scope = if self.public_path {
            self.target_id.as_deref().filter(|t| !t.is_empty())
        } else {
            Some(user_id)
        };
        if let Some(owner_id) = owner_scope {
            filters.push(Predicate::equals(OWNER_FIELD, FieldValue::str(owner_id)));
        }

        let shared = if self.public_path {
            Some(true)
        } else {
            match self.state {
                CollectionState::All => None,
                CollectionState::Public => Some(true),
                CollectionState::Private => Some(false),
            }
        };
        if let Some(shared) = shared {
            filters.push(Predicate::equals(SHARED_FIELD, FieldValue::Bool(shared)));
        }

        // Exact lowercase match only: the backing store has no substring
        // query over document fields.
        if let Some(q) = self.q.as_deref() {
            if !q.is_empty() {
                filters.push(Predicate::equals(
                    LOWERCASE_NAME_FIELD,
                    FieldValue::str(q.to_lowercase()),
                ));
            }
        }

        if let Some(date) = self.date {
            if let Some(p) = date_predicate(CREATED_AT_FIELD, date, self.date_cmp) {
                filters.push(p);
            }
        }

        and_all(filters)
    }
}

/// Collection CRUD and state transitions.
///
/// Deletion and shared→private transitions hand off to the reference
/// cascade before returning; the cascade itself is not awaited.
pub struct CollectionManager {
    store: SharedStore<Collection>,
    files: Arc<FileService>,
    cascade: ReferenceCascade,
}

impl CollectionManager {
    pub fn new(
        store: SharedStore<Collection>,
        files: Arc<FileService>,
        cascade: ReferenceCascade,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            files,
            cascade,
        })
    }

    /// Unfiltered paged listing of the caller's collections.
    pub async fn find(
        &self,
        owner_id: &str,
        direction: SortDirection,
        page: u32,
        size: u32,
    ) -> Result<CollectionPage> {
        let request = PageRequest::new(CREATED_AT_FIELD, direction, page, size);
        let items = self
            .store
            .find_by_field(OWNER_FIELD, FieldValue::str(owner_id), Some(&request))
            .await?;
        let total = self
            .store
            .count_by_field(OWNER_FIELD, FieldValue::str(owner_id))
            .await?;

        let files = self.page_files(&items).await;
        Ok(CollectionPage {
            page: PagedResult::new(items, total, size, page),
            files,
        })
    }

    /// Filtered paged listing. The total count is an independent aggregate
    /// over the same predicate, never derived from the page slice.
    pub async fn filter(&self, user_id: &str, query: &CollectionQuery) -> Result<CollectionPage> {
        let predicate = query.predicate(user_id);

        let total = self.store.count(predicate.as_ref()).await?;
        let items = self
            .store
            .execute(&StructuredQuery {
                predicate,
                order_by: CREATED_AT_FIELD.to_string(),
                direction: query.direction,
                offset: query.page as u64 * query.size as u64,
                limit: query.size as u64,
            })
            .await?;

        let files = self.page_files(&items).await;
        Ok(CollectionPage {
            page: PagedResult::new(items, total, query.size, query.page),
            files,
        })
    }

    pub async fn get(&self, collection_id: &str) -> Result<Collection> {
        self.store
            .get(collection_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("collection « {collection_id} »")))
    }

    /// Point read restricted to the caller's own collections.
    pub async fn get_owned(&self, collection_id: &str, owner_id: &str) -> Result<Collection> {
        let collection = self.get(collection_id).await?;
        if collection.owner_id != owner_id {
            return Err(Error::not_found(format!("collection « {collection_id} »")));
        }
        Ok(collection)
    }

    pub async fn find_all_by_ids(&self, ids: &[String]) -> Result<Vec<Collection>> {
        let mut found = Vec::new();
        for id in ids {
            if let Some(collection) = self.store.get(id).await? {
                found.push(collection);
            }
        }
        Ok(found)
    }

    /// Create a collection after validating file ids, rejecting duplicate
    /// ids in the request, and enforcing case-insensitive name uniqueness.
    /// Checksums are resolved once here and stored as a snapshot.
    pub async fn create(
        &self,
        name: &str,
        file_ids: &[String],
        owner_id: &str,
    ) -> Result<Collection> {
        let mut seen = HashSet::new();
        for file_id in file_ids {
            if !seen.insert(file_id) {
                return Err(Error::invalid(format!("duplicate file « {file_id} »")));
            }
        }

        let valid_ids = self.files.validate_file_ids(file_ids, owner_id).await?;

        let lowercase_name = name.to_lowercase();
        let conflicts = self
            .store
            .count_by_field(LOWERCASE_NAME_FIELD, FieldValue::str(lowercase_name.clone()))
            .await?;
        if conflicts > 0 {
            return Err(Error::invalid(format!(
                "a collection with name « {lowercase_name} » already exists"
            )));
        }

        // one blob-store request at a time, per file
        let mut files = HashMap::new();
        for file_id in &valid_ids {
            let checksum = self.files.checksum(file_id, owner_id).await?;
            files.insert(file_id.clone(), checksum);
        }

        self.store
            .save(Collection::new(name, files, owner_id))
            .await
    }

    /// Merge new checksummed entries into an existing collection.
    ///
    /// Rejects ids repeated within the request or already present in the
    /// collection before validating or writing anything.
    pub async fn add_files(
        &self,
        collection_id: &str,
        owner_id: &str,
        file_ids: &[String],
    ) -> Result<Collection> {
        let mut collection = self.get_owned(collection_id, owner_id).await?;

        let mut seen = HashSet::new();
        for file_id in file_ids {
            if !seen.insert(file_id) || collection.files.contains_key(file_id) {
                return Err(Error::invalid(format!("duplicate file « {file_id} »")));
            }
        }

        let valid_ids = self.files.validate_file_ids(file_ids, owner_id).await?;
        for file_id in &valid_ids {
            let checksum = self.files.checksum(file_id, owner_id).await?;
            collection.files.insert(file_id.clone(), checksum);
        }

        collection.updated_at = Some(now_millis());
        self.store.save(collection).await
    }

    /// Remove a file from the collection. Removing an absent id is a no-op.
    pub async fn remove_file(
        &self,
        collection_id: &str,
        owner_id: &str,
        file_id: &str,
    ) -> Result<Collection> {
        let mut collection = self.get_owned(collection_id, owner_id).await?;
        collection.files.remove(file_id);
        collection.updated_at = Some(now_millis());
        self.store.save(collection).await
    }

    /// Toggle the shared flag. A shared→private transition strips the
    /// collection from other owners' conversations in the background; the
    /// owner's own conversations keep the reference.
    pub async fn update_visibility(
        &self,
        collection_id: &str,
        owner_id: &str,
        shared: bool,
    ) -> Result<Collection> {
        let mut collection = self.get_owned(collection_id, owner_id).await?;
        let revoked = collection.shared && !shared;

        collection.shared = shared;
        collection.updated_at = Some(now_millis());
        let saved = self.store.save(collection).await?;

        if revoked {
            self.cascade.spawn(CascadeEvent::visibility_revoked(
                saved.id.clone().unwrap_or_default(),
                saved.name.clone(),
                owner_id,
            ));
        }

        Ok(saved)
    }

    /// Delete a collection. The cascade over every referencing conversation
    /// is started before the record is removed but not awaited; the delete
    /// reports success as soon as the record is gone.
    pub async fn delete(&self, collection_id: &str, owner_id: &str) -> Result<()> {
        let collection = self.get_owned(collection_id, owner_id).await?;

        self.cascade.spawn(CascadeEvent::deleted(
            collection_id,
            collection.name.clone(),
            owner_id,
        ));

        self.store.delete(collection_id).await
    }

    /// Resolved file details of a collection, readable by the owner or by
    /// anyone while the collection is shared.
    pub async fn collection_files(
        &self,
        collection_id: &str,
        user_id: &str,
    ) -> Result<Vec<FileDetails>> {
        let collection = self.get(collection_id).await?;
        if collection.owner_id != user_id && !collection.shared {
            return Err(Error::forbidden(format!(
                "collection « {} » is not shared",
                collection.name
            )));
        }

        let mut wanted = HashMap::new();
        for file_id in collection.files.keys() {
            wanted.insert(file_id.clone(), collection.owner_id.clone());
        }
        self.files.details_for(&wanted).await
    }

    /// Union of file details across the collections on one page. Resolution
    /// failures degrade to an empty attachment list.
    async fn page_files(&self, collections: &[Collection]) -> Vec<FileDetails> {
        let mut wanted: HashMap<String, String> = HashMap::new();
        for collection in collections {
            for file_id in collection.files.keys() {
                wanted
                    .entry(file_id.clone())
                    .or_insert_with(|| collection.owner_id.clone());
            }
        }

        if wanted.is_empty() {
            return Vec::new();
        }

        match self.files.details_for(&wanted).await {
            Ok(details) => details,
            Err(error) => {
                tracing::warn!("failed to resolve file details for listing: {error}");
                Vec::new()
            }
        }
    }
}
