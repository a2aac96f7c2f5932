//! Conversation lifecycle: history, titles, and collection references.
//!
//! Collection references are only mutated through these operations so the
//! duplicate-free invariant and the audit trail stay consistent — every
//! add/remove appends a system entry to the history.

use std::sync::Arc;

use crate::collections::CollectionManager;
use crate::error::{Error, Result};
use crate::filter::FieldValue;
use crate::models::{now_millis, Collection, Conversation, Message};
use crate::store::SharedStore;

const OWNER_FIELD: &str = "owner_id";

/// Conversation CRUD and reference management.
pub struct ConversationService {
    store: SharedStore<Conversation>,
    collections: Arc<CollectionManager>,
}

impl ConversationService {
    pub fn new(
        store: SharedStore<Conversation>,
        collections: Arc<CollectionManager>,
    ) -> Arc<Self> {
        Arc::new(Self { store, collections })
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        self.store
            .find_by_field(OWNER_FIELD, FieldValue::str(owner_id), None)
            .await
    }

    pub async fn get(&self, conversation_id: &str) -> Result<Conversation> {
        self.store
            .get(conversation_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("conversation « {conversation_id} »")))
    }

    pub async fn get_owned(&self, conversation_id: &str, owner_id: &str) -> Result<Conversation> {
        let conversation = self.get(conversation_id).await?;
        if conversation.owner_id != owner_id {
            return Err(Error::not_found(format!(
                "conversation « {conversation_id} »"
            )));
        }
        Ok(conversation)
    }

    /// Create a conversation, optionally seeding it with collection
    /// references (recorded as a "Conversation started with …" entry).
    pub async fn create(
        &self,
        owner_id: &str,
        collections: Option<&[String]>,
    ) -> Result<Conversation> {
        let saved = self.store.save(Conversation::new(owner_id)).await?;

        match collections {
            Some(ids) if !ids.is_empty() => self.attach(saved, ids, true).await,
            _ => Ok(saved),
        }
    }

    pub async fn delete(&self, conversation_id: &str, owner_id: &str) -> Result<()> {
        let conversation = self.get_owned(conversation_id, owner_id).await?;
        self.store
            .delete(conversation.id.as_deref().unwrap_or(conversation_id))
            .await
    }

    pub async fn update_title(
        &self,
        conversation_id: &str,
        owner_id: &str,
        title: &str,
    ) -> Result<Conversation> {
        let mut conversation = self.get_owned(conversation_id, owner_id).await?;

        if title.trim().is_empty() {
            return Err(Error::validation("title", "must not be blank"));
        }

        conversation.title = Some(title.to_string());
        conversation.updated_at = now_millis();
        self.store.save(conversation).await
    }

    /// Append a question/answer exchange to the history. The first question
    /// becomes the title when none was set.
    pub async fn record_exchange(
        &self,
        conversation_id: &str,
        question: &str,
        rephrased: Option<String>,
        answer: &str,
    ) -> Result<Conversation> {
        let mut conversation = self.get(conversation_id).await?;

        conversation.history.push(Message::user(question, rephrased));
        conversation.history.push(Message::assistant(answer));

        if conversation.title.as_deref().map_or(true, str::is_empty) {
            conversation.title = Some(question.to_string());
        }

        conversation.updated_at = now_millis();
        self.store.save(conversation).await
    }

    pub async fn add_collections(
        &self,
        conversation_id: &str,
        owner_id: &str,
        collection_ids: &[String],
    ) -> Result<Conversation> {
        let conversation = self.get_owned(conversation_id, owner_id).await?;
        self.attach(conversation, collection_ids, false).await
    }

    /// Remove one collection reference, recording the removal. Removing a
    /// reference that was never added is an error.
    pub async fn remove_collection(
        &self,
        conversation_id: &str,
        owner_id: &str,
        collection_id: &str,
    ) -> Result<Conversation> {
        let mut conversation = self.get_owned(conversation_id, owner_id).await?;
        let collection = self.collections.get(collection_id).await?;

        if !conversation.collections.iter().any(|id| id == collection_id) {
            return Err(Error::invalid(format!(
                "collection « {} » wasn't added",
                collection.name
            )));
        }

        conversation.history.push(Message::system(format!(
            "Collection « {} » removed from the discussion",
            collection.name
        )));
        conversation.collections.retain(|id| id != collection_id);
        conversation.updated_at = now_millis();
        self.store.save(conversation).await
    }

    /// Drop every collection reference at once.
    pub async fn remove_all_collections(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<Conversation> {
        let mut conversation = self.get_owned(conversation_id, owner_id).await?;

        conversation
            .history
            .push(Message::system("All collections were removed from the discussion"));
        conversation.collections.clear();
        conversation.updated_at = now_millis();
        self.store.save(conversation).await
    }

    /// Resolve the conversation's referenced collections.
    pub async fn collections(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<Vec<Collection>> {
        let conversation = self.get_owned(conversation_id, owner_id).await?;
        if conversation.collections.is_empty() {
            return Ok(Vec::new());
        }
        self.collections
            .find_all_by_ids(&conversation.collections)
            .await
    }

    pub async fn clear_history(
        &self,
        conversation_id: &str,
        owner_id: &str,
    ) -> Result<Conversation> {
        let mut conversation = self.get_owned(conversation_id, owner_id).await?;
        conversation.history.clear();
        conversation.updated_at = now_millis();
        self.store.save(conversation).await
    }

    /// Validate and attach collection references, recording one system
    /// entry naming everything added.
    ///
    /// Every id must resolve to a collection the conversation owner may
    /// reference (their own, or currently shared), and must not already be
    /// in scope; nothing is written otherwise.
    async fn attach(
        &self,
        mut conversation: Conversation,
        collection_ids: &[String],
        new_conversation: bool,
    ) -> Result<Conversation> {
        let resolved = self.collections.find_all_by_ids(collection_ids).await?;

        let mut names = Vec::new();
        for collection_id in collection_ids {
            let found = resolved
                .iter()
                .find(|c| c.id.as_deref() == Some(collection_id.as_str()));

            match found {
                None => {
                    return Err(Error::invalid(format!(
                        "collection « {collection_id} » not found"
                    )))
                }
                Some(collection)
                    if collection.owner_id != conversation.owner_id && !collection.shared =>
                {
                    return Err(Error::forbidden(format!(
                        "collection « {} » is not shared",
                        collection.name
                    )))
                }
                Some(collection) if conversation.collections.contains(collection_id) => {
                    return Err(Error::invalid(format!(
                        "collection « {} » already added",
                        collection.name
                    )))
                }
                Some(collection) => names.push(collection.name.clone()),
            }
        }

        if !names.is_empty() {
            let plural = if names.len() > 1 { "s" } else { "" };
            let all_names = names.join(", ");
            let content = if new_conversation {
                format!(
                    "Conversation started with {} collection{}: {}",
                    names.len(),
                    plural,
                    all_names
                )
            } else {
                format!("Collection{plural} « {all_names} » added to the discussion")
            };
            conversation.history.push(Message::system(content));
            conversation
                .collections
                .extend(collection_ids.iter().cloned());
        }

        conversation.updated_at = now_millis();
        self.store.save(conversation).await
    }
}
