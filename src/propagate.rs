//! Reference cascade between collections and conversations.
//!
//! The store has no foreign keys, cascading deletes, or cross-entity
//! transactions, so conversations hold weak references to collections and
//! this module repairs them procedurally: scan every conversation, retain
//! the eligible ones, strip the stale reference, append an audit entry, and
//! save each conversation independently.
//!
//! The cascade runs as a detached task ([`ReferenceCascade::spawn`]): the
//! triggering operation returns as soon as its own mutation is durable,
//! while the cascade completes — or logs its failure — in the background.
//! One best-effort attempt, no retry queue, no rollback of the trigger.

use crate::error::Result;
use crate::models::{now_millis, Conversation, Message};
use crate::store::SharedStore;

/// What happened to the collection being cascaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeMode {
    /// The collection was deleted: strip it from every referencing
    /// conversation, the owner's included.
    Deleted,
    /// The collection went shared → private: strip it only from
    /// conversations not owned by the collection owner, who still has
    /// access.
    VisibilityRevoked,
}

/// A single propagation request.
#[derive(Debug, Clone)]
pub struct CascadeEvent {
    pub collection_id: String,
    pub collection_name: String,
    pub triggered_by: String,
    pub mode: CascadeMode,
}

impl CascadeEvent {
    pub fn deleted(
        collection_id: impl Into<String>,
        collection_name: impl Into<String>,
        triggered_by: impl Into<String>,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            collection_name: collection_name.into(),
            triggered_by: triggered_by.into(),
            mode: CascadeMode::Deleted,
        }
    }

    pub fn visibility_revoked(
        collection_id: impl Into<String>,
        collection_name: impl Into<String>,
        triggered_by: impl Into<String>,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            collection_name: collection_name.into(),
            triggered_by: triggered_by.into(),
            mode: CascadeMode::VisibilityRevoked,
        }
    }

    fn applies_to(&self, conversation: &Conversation) -> bool {
        conversation.collections.contains(&self.collection_id)
            && (self.mode == CascadeMode::Deleted
                || conversation.owner_id != self.triggered_by)
    }

    fn audit_message(&self, conversation_owner: &str) -> String {
        match self.mode {
            CascadeMode::Deleted => {
                if conversation_owner == self.triggered_by {
                    format!(
                        "Collection « {} » was deleted and removed from the discussion",
                        self.collection_name
                    )
                } else {
                    format!(
                        "Collection « {} » was deleted by their owner and was removed from the discussion",
                        self.collection_name
                    )
                }
            }
            CascadeMode::VisibilityRevoked => format!(
                "Collection « {} » was removed from public space!",
                self.collection_name
            ),
        }
    }
}

/// Weak-reference cascade over the conversation store.
///
/// Reusable for any entity pair following the same weak-reference pattern:
/// the only coupling to collections is the event payload.
#[derive(Clone)]
pub struct ReferenceCascade {
    conversations: SharedStore<Conversation>,
}

impl ReferenceCascade {
    pub fn new(conversations: SharedStore<Conversation>) -> Self {
        Self { conversations }
    }

    /// Run the cascade to completion, returning how many conversations were
    /// updated. A save failure on one conversation is logged and does not
    /// block the others.
    pub async fn run(&self, event: &CascadeEvent) -> Result<usize> {
        let affected: Vec<Conversation> = self
            .conversations
            .find_all()
            .await?
            .into_iter()
            .filter(|c| event.applies_to(c))
            .collect();

        let mut updated = 0;
        for mut conversation in affected {
            let message = event.audit_message(&conversation.owner_id);
            conversation
                .collections
                .retain(|id| id != &event.collection_id);
            conversation.history.push(Message::system(message));
            conversation.updated_at = now_millis();

            match self.conversations.save(conversation).await {
                Ok(_) => updated += 1,
                Err(error) => tracing::error!(
                    collection = %event.collection_id,
                    "failed to update conversation during cascade: {error}"
                ),
            }
        }

        Ok(updated)
    }

    /// Start the cascade without awaiting it. The returned handle is safe to
    /// drop; outcomes are logged.
    pub fn spawn(&self, event: CascadeEvent) -> tokio::task::JoinHandle<()> {
        let cascade = self.clone();
        tokio::spawn(async move {
            match cascade.run(&event).await {
                Ok(updated) => tracing::info!(
                    collection = %event.collection_id,
                    updated,
                    "collection references cascaded"
                ),
                Err(error) => tracing::error!(
                    collection = %event.collection_id,
                    "reference cascade failed: {error}"
                ),
            }
        })
    }
}
