//! File metadata service over the blob store.
//!
//! The blob store offers prefix listing only, so the filtered listing is a
//! fully in-memory pipeline: list the caller's namespace, apply the shared
//! predicate tree, count the filtered set, sort, slice the requested page,
//! and map survivors to display records.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::blob::{BlobObject, SharedBlobStore};
use crate::error::{Error, Result};
use crate::filter::{
    and_all, date_predicate, DateComparator, FieldSource, FieldValue, FileSortKey, FileStatus,
    Predicate, SortDirection,
};
use crate::models::{Collection, FileDetails, PagedResult};
use crate::store::SharedStore;

pub const STATUS_METADATA_KEY: &str = "status";
pub const KEYWORDS_METADATA_KEY: &str = "keywords";

/// Filter parameters for the file listing.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub q: Option<String>,
    pub date: Option<NaiveDate>,
    /// Absent comparator defaults to `EQ` when a date is given; an explicit
    /// `NONE` disables the date filter.
    pub date_cmp: Option<DateComparator>,
    pub status: FileStatus,
    pub sort_by: Option<FileSortKey>,
    pub direction: SortDirection,
    pub page: u32,
    pub size: u32,
}

/// File validation, checksum resolution, and filtered listings.
pub struct FileService {
    blobs: SharedBlobStore,
    collections: SharedStore<Collection>,
    namespace_root: String,
}

impl FileService {
    pub fn new(
        blobs: SharedBlobStore,
        collections: SharedStore<Collection>,
        namespace_root: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            blobs,
            collections,
            namespace_root: namespace_root.into(),
        })
    }

    fn folder(&self, owner_id: &str) -> String {
        format!("{}/{}/", self.namespace_root, owner_id)
    }

    /// Check that every id names an existing blob in the caller's namespace.
    ///
    /// Fails with [`Error::InvalidFiles`] listing every missing id; no
    /// partial result is returned.
    pub async fn validate_file_ids(&self, file_ids: &[String], owner_id: &str) -> Result<Vec<String>> {
        let folder = self.folder(owner_id);
        let mut invalid = Vec::new();

        for file_id in file_ids {
            if !self.blobs.exists(&format!("{folder}{file_id}")).await? {
                invalid.push(file_id.clone());
            }
        }

        if invalid.is_empty() {
            Ok(file_ids.to_vec())
        } else {
            Err(Error::InvalidFiles(invalid))
        }
    }

    /// Current content checksum of a stored file.
    pub async fn checksum(&self, file_id: &str, owner_id: &str) -> Result<String> {
        let path = format!("{}{}", self.folder(owner_id), file_id);
        match self.blobs.get(&path).await? {
            Some(blob) => Ok(blob.checksum),
            None => Err(Error::not_found(format!("file « {file_id} »"))),
        }
    }

    /// Unfiltered listing of the caller's namespace.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<FileDetails>> {
        let folder = self.folder(owner_id);
        let blobs = self.blobs.list(&folder).await?;
        Ok(blobs
            .into_iter()
            .map(|blob| FileEntry::new(blob, &folder).into_details())
            .collect())
    }

    /// Display record for a single stored file.
    pub async fn get(&self, file_id: &str, owner_id: &str) -> Result<FileDetails> {
        let folder = self.folder(owner_id);
        match self.blobs.get(&format!("{folder}{file_id}")).await? {
            Some(blob) => Ok(FileEntry::new(blob, &folder).into_details()),
            None => Err(Error::not_found(format!("file « {file_id} »"))),
        }
    }

    /// Resolve display records for a batch of `file id → owner id` pairs,
    /// skipping blobs that no longer exist.
    pub async fn details_for(&self, file_owners: &HashMap<String, String>) -> Result<Vec<FileDetails>> {
        let mut details = Vec::new();
        for (file_id, owner_id) in file_owners {
            let folder = self.folder(owner_id);
            if let Some(blob) = self.blobs.get(&format!("{folder}{file_id}")).await? {
                details.push(FileEntry::new(blob, &folder).into_details());
            }
        }
        details.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(details)
    }

    /// Paginated, sorted, filtered listing of the caller's namespace.
    pub async fn filter(&self, owner_id: &str, filter: &FileFilter) -> Result<PagedResult<FileDetails>> {
        let folder = self.folder(owner_id);
        let blobs = self.blobs.list(&folder).await?;

        let predicate = file_predicate(filter);
        let mut hits: Vec<FileEntry> = blobs
            .into_iter()
            .map(|blob| FileEntry::new(blob, &folder))
            .filter(|entry| predicate.as_ref().map_or(true, |p| p.matches(entry)))
            .collect();

        let total_elements = hits.len() as u64;

        if let Some(key) = filter.sort_by {
            sort_entries(&mut hits, key, filter.direction);
        }

        let items: Vec<FileDetails> = hits
            .into_iter()
            .skip(filter.page as usize * filter.size as usize)
            .take(filter.size as usize)
            .map(FileEntry::into_details)
            .collect();

        Ok(PagedResult::new(items, total_elements, filter.size, filter.page))
    }

    /// Delete a stored file.
    ///
    /// Refuses while any collection still references the file id — the
    /// reference must be removed from the collection first.
    pub async fn delete(&self, file_id: &str, owner_id: &str) -> Result<()> {
        let in_use = self
            .collections
            .find_all()
            .await?
            .iter()
            .any(|collection| collection.files.contains_key(file_id));

        if in_use {
            return Err(Error::invalid(format!(
                "file « {file_id} » is still referenced by a collection"
            )));
        }

        let path = format!("{}{}", self.folder(owner_id), file_id);
        if self.blobs.remove(&path).await? {
            Ok(())
        } else {
            Err(Error::not_found(format!("file « {file_id} »")))
        }
    }
}

// ============ In-memory filter pipeline ============

/// A listed blob paired with the derived values the predicate and sort
/// steps need.
struct FileEntry {
    blob: BlobObject,
    file_name: String,
    original_name: String,
    status: FileStatus,
}

impl FileEntry {
    fn new(blob: BlobObject, folder: &str) -> Self {
        let file_name = blob
            .name
            .strip_prefix(folder)
            .unwrap_or(&blob.name)
            .to_string();
        let original_name = strip_unique_prefix(&file_name).to_string();
        let status = FileStatus::from_metadata(
            blob.metadata.get(STATUS_METADATA_KEY).map(String::as_str),
        );
        Self {
            blob,
            file_name,
            original_name,
            status,
        }
    }

    fn into_details(self) -> FileDetails {
        FileDetails {
            original_name: self.original_name,
            date_uploaded: self.blob.created_at,
            size_in_bytes: self.blob.size,
            size_readable: human_readable_size(self.blob.size),
            checksum: self.blob.checksum,
            metadata: self.blob.metadata,
            name: self.file_name,
        }
    }
}

impl FieldSource for FileEntry {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "name" => Some(FieldValue::str(self.file_name.clone())),
            "keywords" => self
                .blob
                .metadata
                .get(KEYWORDS_METADATA_KEY)
                .map(|k| FieldValue::str(k.clone())),
            "status" => Some(FieldValue::str(self.status.as_str())),
            "created_at" => Some(FieldValue::Int(self.blob.created_at)),
            "updated_at" => self.blob.updated_at.map(FieldValue::Int),
            "size" => Some(FieldValue::Int(self.blob.size)),
            _ => None,
        }
    }
}

fn file_predicate(filter: &FileFilter) -> Option<Predicate> {
    let mut filters = Vec::new();

    if let Some(q) = filter.q.as_deref() {
        if !q.trim().is_empty() {
            filters.push(Predicate::Or(vec![
                Predicate::contains("name", q),
                Predicate::contains("keywords", q),
            ]));
        }
    }

    if filter.status != FileStatus::All {
        filters.push(Predicate::equals(
            "status",
            FieldValue::str(filter.status.as_str()),
        ));
    }

    if let Some(date) = filter.date {
        let cmp = filter.date_cmp.unwrap_or(DateComparator::Eq);
        if let Some(p) = date_predicate("created_at", date, cmp) {
            filters.push(p);
        }
    }

    and_all(filters)
}

/// Sort entries by the requested key. Names compare case-insensitively on
/// the original filename; absent timestamps sort last in either direction.
fn sort_entries(entries: &mut [FileEntry], key: FileSortKey, direction: SortDirection) {
    entries.sort_by(|a, b| {
        let ordering = match key {
            FileSortKey::Name => a
                .original_name
                .to_lowercase()
                .cmp(&b.original_name.to_lowercase()),
            FileSortKey::Size => a.blob.size.cmp(&b.blob.size),
            FileSortKey::CreateTime => a.blob.created_at.cmp(&b.blob.created_at),
            FileSortKey::UpdateTime => match (a.blob.updated_at, b.blob.updated_at) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => return Ordering::Greater,
                (Some(_), None) => return Ordering::Less,
                (Some(ua), Some(ub)) => {
                    let cmp = ua.cmp(&ub);
                    return match direction {
                        SortDirection::Asc => cmp,
                        SortDirection::Desc => cmp.reverse(),
                    };
                }
            },
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Recover the original filename from a stored blob name of the form
/// `{uuid}-{original}`. Falls back to the full name when the prefix is
/// missing or malformed.
fn strip_unique_prefix(file_name: &str) -> &str {
    match file_name.splitn(6, '-').nth(5) {
        Some(rest) if !rest.is_empty() => rest,
        _ => file_name,
    }
}

fn human_readable_size(bytes: i64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let exp = ((bytes as f64).ln() / 1024_f64.ln()) as usize;
    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp - 1];
    format!("{:.1} {}B", bytes as f64 / 1024_f64.powi(exp as i32), prefix)
}
