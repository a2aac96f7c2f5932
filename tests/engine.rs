use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use docshelf::blob::{BlobObject, MemoryBlobStore};
use docshelf::collections::{CollectionManager, CollectionQuery};
use docshelf::conversations::ConversationService;
use docshelf::error::Error;
use docshelf::files::{FileFilter, FileService};
use docshelf::filter::{
    parse_iso_date, CollectionState, DateComparator, FileSortKey, FileStatus, SortDirection,
};
use docshelf::models::{Collection, Conversation, MessageRole};
use docshelf::propagate::ReferenceCascade;
use docshelf::store::memory::MemoryStore;
use docshelf::store::sqlite::SqliteStore;
use docshelf::store::SharedStore;

struct Engine {
    blobs: Arc<MemoryBlobStore>,
    collections_store: SharedStore<Collection>,
    conversations_store: SharedStore<Conversation>,
    files: Arc<FileService>,
    collections: Arc<CollectionManager>,
    conversations: Arc<ConversationService>,
}

fn engine() -> Engine {
    let blobs = Arc::new(MemoryBlobStore::new());
    let collections_store: SharedStore<Collection> = Arc::new(MemoryStore::new());
    let conversations_store: SharedStore<Conversation> = Arc::new(MemoryStore::new());

    let files = FileService::new(blobs.clone(), collections_store.clone(), "users");
    let cascade = ReferenceCascade::new(conversations_store.clone());
    let collections = CollectionManager::new(collections_store.clone(), files.clone(), cascade);
    let conversations = ConversationService::new(conversations_store.clone(), collections.clone());

    Engine {
        blobs,
        collections_store,
        conversations_store,
        files,
        collections,
        conversations,
    }
}

fn upload(engine: &Engine, owner: &str, file_id: &str, content: &[u8]) {
    engine
        .blobs
        .put(&format!("users/{owner}/{file_id}"), content, HashMap::new());
}

fn upload_with_metadata(
    engine: &Engine,
    owner: &str,
    file_id: &str,
    content: &[u8],
    metadata: &[(&str, &str)],
) {
    let metadata = metadata
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    engine
        .blobs
        .put(&format!("users/{owner}/{file_id}"), content, metadata);
}

/// Cascades are detached tasks; poll with a bound instead of awaiting them.
async fn wait_for_conversation<F>(
    store: &SharedStore<Conversation>,
    id: &str,
    condition: F,
) -> Conversation
where
    F: Fn(&Conversation) -> bool,
{
    for _ in 0..100 {
        let conversation = store.get(id).await.unwrap().unwrap();
        if condition(&conversation) {
            return conversation;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("conversation {id} never reached the expected state");
}

#[tokio::test]
async fn test_create_snapshots_checksums() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"first file");
    upload(&engine, "u1", "f2", b"second file");

    let collection = engine
        .collections
        .create("Reports", &["f1".to_string(), "f2".to_string()], "u1")
        .await
        .unwrap();

    assert_eq!(collection.lowercase_name, "reports");
    assert_eq!(collection.files.len(), 2);
    let expected = engine.files.checksum("f1", "u1").await.unwrap();
    assert_eq!(collection.files.get("f1"), Some(&expected));
}

#[tokio::test]
async fn test_create_rejects_duplicate_file_ids_without_persisting() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data");

    let result = engine
        .collections
        .create("Reports", &["f1".to_string(), "f1".to_string()], "u1")
        .await;

    assert!(matches!(result, Err(Error::InvalidOperation(_))));
    assert_eq!(engine.collections_store.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_rejects_case_insensitive_name_conflict() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data");

    engine
        .collections
        .create("Reports", &["f1".to_string()], "u1")
        .await
        .unwrap();
    let conflict = engine.collections.create("REPORTS", &[], "u1").await;

    assert!(matches!(conflict, Err(Error::InvalidOperation(_))));
    assert_eq!(engine.collections_store.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_rejects_unknown_files() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data");

    let result = engine
        .collections
        .create("Reports", &["f1".to_string(), "ghost".to_string()], "u1")
        .await;

    match result {
        Err(Error::InvalidFiles(ids)) => assert_eq!(ids, vec!["ghost".to_string()]),
        other => panic!("expected InvalidFiles, got {:?}", other.map(|c| c.name)),
    }
    assert_eq!(engine.collections_store.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_add_files_rejects_ids_already_in_collection() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data");
    upload(&engine, "u1", "f2", b"more");

    let collection = engine
        .collections
        .create("Reports", &["f1".to_string()], "u1")
        .await
        .unwrap();
    let id = collection.id.unwrap();

    let duplicate = engine
        .collections
        .add_files(&id, "u1", &["f1".to_string()])
        .await;
    assert!(matches!(duplicate, Err(Error::InvalidOperation(_))));

    let added = engine
        .collections
        .add_files(&id, "u1", &["f2".to_string()])
        .await
        .unwrap();
    assert_eq!(added.files.len(), 2);
    assert!(added.updated_at.is_some());
}

#[tokio::test]
async fn test_remove_file_is_idempotent() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data");

    let collection = engine
        .collections
        .create("Reports", &["f1".to_string()], "u1")
        .await
        .unwrap();
    let id = collection.id.unwrap();

    let removed = engine.collections.remove_file(&id, "u1", "f1").await.unwrap();
    assert!(removed.files.is_empty());
    let again = engine.collections.remove_file(&id, "u1", "f1").await.unwrap();
    assert!(again.files.is_empty());
}

#[tokio::test]
async fn test_delete_cascades_into_every_referencing_conversation() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data");

    let collection = engine
        .collections
        .create("Reports", &["f1".to_string()], "u1")
        .await
        .unwrap();
    let collection_id = collection.id.clone().unwrap();

    engine
        .collections
        .update_visibility(&collection_id, "u1", true)
        .await
        .unwrap();

    let mine = engine
        .conversations
        .create("u1", Some(&[collection_id.clone()]))
        .await
        .unwrap();
    let theirs = engine
        .conversations
        .create("u2", Some(&[collection_id.clone()]))
        .await
        .unwrap();

    engine.collections.delete(&collection_id, "u1").await.unwrap();
    assert!(engine
        .collections_store
        .get(&collection_id)
        .await
        .unwrap()
        .is_none());

    let mine = wait_for_conversation(
        &engine.conversations_store,
        mine.id.as_deref().unwrap(),
        |c| c.collections.is_empty(),
    )
    .await;
    let theirs = wait_for_conversation(
        &engine.conversations_store,
        theirs.id.as_deref().unwrap(),
        |c| c.collections.is_empty(),
    )
    .await;

    let system_entries: Vec<_> = mine
        .history
        .iter()
        .filter(|m| m.role == MessageRole::System && m.content.contains("was deleted"))
        .collect();
    assert_eq!(system_entries.len(), 1);
    assert!(system_entries[0].content.contains("« Reports »"));

    assert!(theirs
        .history
        .last()
        .unwrap()
        .content
        .contains("was deleted by their owner"));
}

#[tokio::test]
async fn test_revoking_visibility_strips_other_owners_but_not_the_owner() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"cs1");
    upload(&engine, "u1", "f2", b"cs2");

    let reports = engine
        .collections
        .create("Reports", &["f1".to_string(), "f2".to_string()], "u1")
        .await
        .unwrap();
    let reports_id = reports.id.clone().unwrap();

    engine
        .collections
        .update_visibility(&reports_id, "u1", true)
        .await
        .unwrap();

    let mine = engine
        .conversations
        .create("u1", Some(&[reports_id.clone()]))
        .await
        .unwrap();
    let theirs = engine
        .conversations
        .create("u2", Some(&[reports_id.clone()]))
        .await
        .unwrap();

    engine
        .collections
        .update_visibility(&reports_id, "u1", false)
        .await
        .unwrap();

    let theirs = wait_for_conversation(
        &engine.conversations_store,
        theirs.id.as_deref().unwrap(),
        |c| c.collections.is_empty(),
    )
    .await;
    assert!(theirs
        .history
        .last()
        .unwrap()
        .content
        .contains("« Reports » was removed from public space!"));

    // the owner keeps access, so their conversation keeps the reference
    let mine = engine
        .conversations_store
        .get(mine.id.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mine.collections, vec![reports_id]);
}

#[tokio::test]
async fn test_pagination_shape_over_25_collections() {
    let engine = engine();
    for i in 0..25 {
        let mut collection = Collection::new(format!("c{i:02}"), HashMap::new(), "u1");
        collection.created_at = i;
        engine.collections_store.save(collection).await.unwrap();
    }

    let mut sizes = Vec::new();
    for page in 0..3 {
        let query = CollectionQuery {
            direction: SortDirection::Asc,
            page,
            size: 10,
            ..Default::default()
        };
        let result = engine.collections.filter("u1", &query).await.unwrap();
        assert_eq!(result.page.total_elements, 25);
        assert_eq!(result.page.total_pages(), 3);
        sizes.push(result.page.items.len());
    }
    assert_eq!(sizes, vec![10, 10, 5]);
}

#[tokio::test]
async fn test_filter_without_parameters_matches_unfiltered_listing() {
    let engine = engine();
    for (name, owner, shared) in [
        ("a", "u1", false),
        ("b", "u1", true),
        ("c", "u1", false),
        ("d", "u2", true),
    ] {
        let mut collection = Collection::new(name, HashMap::new(), owner);
        collection.shared = shared;
        engine.collections_store.save(collection).await.unwrap();
    }

    let unfiltered = engine
        .collections
        .find("u1", SortDirection::Desc, 0, 10)
        .await
        .unwrap();
    let filtered = engine
        .collections
        .filter("u1", &CollectionQuery { size: 10, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(unfiltered.page.total_elements, 3);
    assert_eq!(filtered.page.total_elements, unfiltered.page.total_elements);
}

#[tokio::test]
async fn test_collection_filter_state_and_date() {
    let engine = engine();
    let day = parse_iso_date("2025-03-14").unwrap();
    let (start, end) = docshelf::filter::day_bounds(day);

    for (name, created_at, shared) in [
        ("inside", start, true),
        ("edge", end, false),
        ("before", start - 1, false),
    ] {
        let mut collection = Collection::new(name, HashMap::new(), "u1");
        collection.created_at = created_at;
        collection.shared = shared;
        engine.collections_store.save(collection).await.unwrap();
    }

    let on_day = engine
        .collections
        .filter(
            "u1",
            &CollectionQuery {
                date: Some(day),
                date_cmp: DateComparator::Eq,
                size: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(on_day.page.total_elements, 2);

    let private_only = engine
        .collections
        .filter(
            "u1",
            &CollectionQuery {
                state: CollectionState::Private,
                size: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(private_only.page.total_elements, 2);

    // exact lowercase name match, not substring
    let by_name = engine
        .collections
        .filter(
            "u1",
            &CollectionQuery {
                q: Some("INSIDE".to_string()),
                size: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_name.page.total_elements, 1);

    let substring = engine
        .collections
        .filter(
            "u1",
            &CollectionQuery {
                q: Some("insi".to_string()),
                size: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(substring.page.total_elements, 0);
}

#[tokio::test]
async fn test_listing_attaches_file_details_union() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data-1");
    upload(&engine, "u1", "f2", b"data-2");

    engine
        .collections
        .create("Reports", &["f1".to_string(), "f2".to_string()], "u1")
        .await
        .unwrap();
    engine
        .collections
        .create("Archive", &["f1".to_string()], "u1")
        .await
        .unwrap();

    let page = engine
        .collections
        .find("u1", SortDirection::Desc, 0, 10)
        .await
        .unwrap();
    // union, not per-collection repetition
    assert_eq!(page.files.len(), 2);
}

#[tokio::test]
async fn test_collection_files_respects_visibility() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data");

    let collection = engine
        .collections
        .create("Reports", &["f1".to_string()], "u1")
        .await
        .unwrap();
    let id = collection.id.unwrap();

    assert!(matches!(
        engine.collections.collection_files(&id, "u2").await,
        Err(Error::Forbidden(_))
    ));
    assert_eq!(
        engine
            .collections
            .collection_files(&id, "u1")
            .await
            .unwrap()
            .len(),
        1
    );

    engine
        .collections
        .update_visibility(&id, "u1", true)
        .await
        .unwrap();
    assert_eq!(
        engine
            .collections
            .collection_files(&id, "u2")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_file_filter_pipeline() {
    let engine = engine();
    upload_with_metadata(
        &engine,
        "u1",
        "1f2e3d4c-aaaa-bbbb-cccc-dddddddddddd-annual budget.pdf",
        &[1u8; 2048],
        &[("status", "indexed")],
    );
    upload_with_metadata(
        &engine,
        "u1",
        "2f2e3d4c-aaaa-bbbb-cccc-dddddddddddd-notes.txt",
        &[1u8; 512],
        &[("keywords", "budget,planning")],
    );
    upload_with_metadata(
        &engine,
        "u1",
        "3f2e3d4c-aaaa-bbbb-cccc-dddddddddddd-photo.png",
        &[1u8; 4096],
        &[("status", "failed")],
    );
    upload(&engine, "u2", "4f2e3d4c-aaaa-bbbb-cccc-dddddddddddd-other.txt", b"x");

    // text matches stored name or keywords metadata
    let by_text = engine
        .files
        .filter(
            "u1",
            &FileFilter {
                q: Some("budget".to_string()),
                size: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_text.total_elements, 2);

    // unset status metadata reads as pending
    let pending = engine
        .files
        .filter(
            "u1",
            &FileFilter {
                status: FileStatus::Pending,
                size: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(pending.total_elements, 1);
    assert_eq!(pending.items[0].original_name, "notes.txt");

    let by_size = engine
        .files
        .filter(
            "u1",
            &FileFilter {
                sort_by: Some(FileSortKey::Size),
                direction: SortDirection::Desc,
                size: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_size.total_elements, 3);
    assert_eq!(by_size.items.len(), 2);
    assert_eq!(by_size.items[0].original_name, "photo.png");
    assert_eq!(by_size.items[0].size_readable, "4.0 KB");

    let second_page = engine
        .files
        .filter(
            "u1",
            &FileFilter {
                sort_by: Some(FileSortKey::Size),
                direction: SortDirection::Desc,
                page: 1,
                size: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(second_page.items.len(), 1);
    assert_eq!(second_page.items[0].original_name, "notes.txt");
}

#[tokio::test]
async fn test_file_delete_refuses_while_referenced() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data");

    let collection = engine
        .collections
        .create("Reports", &["f1".to_string()], "u1")
        .await
        .unwrap();
    let id = collection.id.unwrap();

    assert!(matches!(
        engine.files.delete("f1", "u1").await,
        Err(Error::InvalidOperation(_))
    ));

    engine.collections.remove_file(&id, "u1", "f1").await.unwrap();
    engine.files.delete("f1", "u1").await.unwrap();
    assert!(matches!(
        engine.files.delete("f1", "u1").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_conversation_reference_rules() {
    let engine = engine();
    upload(&engine, "u1", "f1", b"data");

    let shared = engine
        .collections
        .create("Shared", &["f1".to_string()], "u1")
        .await
        .unwrap();
    let shared_id = shared.id.clone().unwrap();
    engine
        .collections
        .update_visibility(&shared_id, "u1", true)
        .await
        .unwrap();

    let private = engine.collections.create("Private", &[], "u1").await.unwrap();
    let private_id = private.id.clone().unwrap();

    let conversation = engine.conversations.create("u2", None).await.unwrap();
    let conv_id = conversation.id.clone().unwrap();

    // someone else's private collection cannot be referenced
    assert!(matches!(
        engine
            .conversations
            .add_collections(&conv_id, "u2", &[private_id.clone()])
            .await,
        Err(Error::Forbidden(_))
    ));

    let updated = engine
        .conversations
        .add_collections(&conv_id, "u2", &[shared_id.clone()])
        .await
        .unwrap();
    assert_eq!(updated.collections, vec![shared_id.clone()]);
    assert!(updated
        .history
        .last()
        .unwrap()
        .content
        .contains("« Shared » added to the discussion"));

    assert!(matches!(
        engine
            .conversations
            .add_collections(&conv_id, "u2", &[shared_id.clone()])
            .await,
        Err(Error::InvalidOperation(_))
    ));

    let removed = engine
        .conversations
        .remove_collection(&conv_id, "u2", &shared_id)
        .await
        .unwrap();
    assert!(removed.collections.is_empty());

    // removing a reference that was never added is an error
    assert!(matches!(
        engine
            .conversations
            .remove_collection(&conv_id, "u2", &shared_id)
            .await,
        Err(Error::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn test_conversation_exchange_and_history() {
    let engine = engine();
    let conversation = engine.conversations.create("u1", None).await.unwrap();
    let conv_id = conversation.id.clone().unwrap();

    let updated = engine
        .conversations
        .record_exchange(
            &conv_id,
            "What changed last quarter?",
            Some("Summarize last quarter's changes".to_string()),
            "Revenue grew 12%.",
        )
        .await
        .unwrap();

    assert_eq!(updated.title.as_deref(), Some("What changed last quarter?"));
    assert_eq!(updated.history.len(), 2);
    assert_eq!(updated.history[0].role, MessageRole::User);
    assert_eq!(updated.history[1].role, MessageRole::Assistant);

    let renamed = engine
        .conversations
        .update_title(&conv_id, "u1", "Q3 review")
        .await
        .unwrap();
    assert_eq!(renamed.title.as_deref(), Some("Q3 review"));
    assert!(matches!(
        engine.conversations.update_title(&conv_id, "u1", "  ").await,
        Err(Error::Validation { .. })
    ));

    let cleared = engine
        .conversations
        .clear_history(&conv_id, "u1")
        .await
        .unwrap();
    assert!(cleared.history.is_empty());
}

#[tokio::test]
async fn test_conversation_created_with_initial_collections() {
    let engine = engine();
    let a = engine.collections.create("Alpha", &[], "u1").await.unwrap();
    let b = engine.collections.create("Beta", &[], "u1").await.unwrap();

    let conversation = engine
        .conversations
        .create("u1", Some(&[a.id.clone().unwrap(), b.id.clone().unwrap()]))
        .await
        .unwrap();

    assert_eq!(conversation.collections.len(), 2);
    let opening = &conversation.history[0];
    assert_eq!(opening.role, MessageRole::System);
    assert_eq!(
        opening.content,
        "Conversation started with 2 collections: Alpha, Beta"
    );

    let resolved = engine
        .conversations
        .collections(conversation.id.as_deref().unwrap(), "u1")
        .await
        .unwrap();
    assert_eq!(resolved.len(), 2);
}

#[tokio::test]
async fn test_file_date_filter_over_pinned_timestamps() {
    let engine = engine();
    let day = parse_iso_date("2025-03-14").unwrap();
    let (start, end) = docshelf::filter::day_bounds(day);

    for (name, created_at) in [("on-day.txt", start), ("late.txt", end), ("early.txt", start - 1)]
    {
        engine.blobs.put_object(BlobObject {
            name: format!("users/u1/{name}"),
            size: 1,
            created_at,
            updated_at: None,
            checksum: String::new(),
            metadata: HashMap::new(),
        });
    }

    let on_day = engine
        .files
        .filter(
            "u1",
            &FileFilter {
                date: Some(day),
                date_cmp: Some(DateComparator::Eq),
                size: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(on_day.total_elements, 2);

    let outside = engine
        .files
        .filter(
            "u1",
            &FileFilter {
                date: Some(day),
                date_cmp: Some(DateComparator::Diff),
                size: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outside.total_elements, 1);
    assert_eq!(outside.items[0].name, "early.txt");
}

#[tokio::test]
async fn test_unfiltered_file_listing() {
    let engine = engine();
    upload(&engine, "u1", "1f2e3d4c-aaaa-bbbb-cccc-dddddddddddd-report.pdf", b"data");
    upload(&engine, "u2", "2f2e3d4c-aaaa-bbbb-cccc-dddddddddddd-other.txt", b"x");

    let listed = engine.files.list("u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].original_name, "report.pdf");
    assert_eq!(listed[0].size_readable, "4 B");

    let fetched = engine
        .files
        .get("1f2e3d4c-aaaa-bbbb-cccc-dddddddddddd-report.pdf", "u1")
        .await
        .unwrap();
    assert_eq!(fetched.checksum, listed[0].checksum);
}

#[tokio::test]
async fn test_sqlite_backed_stack_runs_the_revoke_scenario() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("docshelf.toml");
    std::fs::write(
        &config_path,
        format!(
            "[db]\npath = \"{}/docshelf.sqlite\"\n",
            dir.path().display()
        ),
    )
    .unwrap();
    let config = docshelf::config::load_config(&config_path).unwrap();

    let blobs = Arc::new(MemoryBlobStore::new());
    let collections_store: SharedStore<Collection> =
        Arc::new(SqliteStore::open(&config.db.path).await.unwrap());
    let conversations_store: SharedStore<Conversation> =
        Arc::new(SqliteStore::open(&config.db.path).await.unwrap());

    let files = FileService::new(
        blobs.clone(),
        collections_store.clone(),
        config.blob.namespace_root.clone(),
    );
    let cascade = ReferenceCascade::new(conversations_store.clone());
    let collections = CollectionManager::new(collections_store.clone(), files, cascade);
    let conversations = ConversationService::new(conversations_store.clone(), collections.clone());

    blobs.put("users/u1/f1", b"cs1", HashMap::new());

    let reports = collections
        .create("Reports", &["f1".to_string()], "u1")
        .await
        .unwrap();
    let reports_id = reports.id.clone().unwrap();
    collections
        .update_visibility(&reports_id, "u1", true)
        .await
        .unwrap();

    let theirs = conversations
        .create("u2", Some(&[reports_id.clone()]))
        .await
        .unwrap();

    collections
        .update_visibility(&reports_id, "u1", false)
        .await
        .unwrap();

    let theirs = wait_for_conversation(
        &conversations_store,
        theirs.id.as_deref().unwrap(),
        |c| c.collections.is_empty(),
    )
    .await;
    assert!(theirs
        .history
        .last()
        .unwrap()
        .content
        .contains("« Reports » was removed from public space!"));

    let size = config.pagination.clamp_size(None);
    let listed = collections
        .filter(
            "u1",
            &CollectionQuery {
                size,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listed.page.total_elements, 1);
    assert_eq!(listed.files.len(), 1);
}

#[tokio::test]
async fn test_conversation_listing_and_deletion() {
    let engine = engine();
    let a = engine.collections.create("Alpha", &[], "u1").await.unwrap();
    let a_id = a.id.clone().unwrap();

    let first = engine
        .conversations
        .create("u1", Some(&[a_id.clone()]))
        .await
        .unwrap();
    engine.conversations.create("u1", None).await.unwrap();
    engine.conversations.create("u2", None).await.unwrap();

    assert_eq!(engine.conversations.list("u1").await.unwrap().len(), 2);
    assert_eq!(engine.conversations.list("u2").await.unwrap().len(), 1);

    let first_id = first.id.clone().unwrap();
    let emptied = engine
        .conversations
        .remove_all_collections(&first_id, "u1")
        .await
        .unwrap();
    assert!(emptied.collections.is_empty());
    assert_eq!(
        emptied.history.last().unwrap().content,
        "All collections were removed from the discussion"
    );

    // only the owner may delete
    assert!(matches!(
        engine.conversations.delete(&first_id, "u2").await,
        Err(Error::NotFound(_))
    ));
    engine.conversations.delete(&first_id, "u1").await.unwrap();
    assert_eq!(engine.conversations.list("u1").await.unwrap().len(), 1);
}
