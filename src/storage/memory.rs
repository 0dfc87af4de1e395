//! In-Memory Conversation Storage
//!
//! Transcripts live for the lifetime of the process. Each conversation is an
//! independent shard entry, so traffic for one user never waits on another.

use super::ConversationStorage;
use crate::core::llm::ChatMessage;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Default)]
pub struct InMemoryStorage {
    conversations: DashMap<String, Vec<ChatMessage>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStorage for InMemoryStorage {
    async fn save(&self, conversation_id: &str, messages: &[ChatMessage]) -> Result<()> {
        self.conversations
            .insert(conversation_id.to_string(), messages.to_vec());
        tracing::debug!(
            "[InMemoryStorage] Saved {} messages for '{}'",
            messages.len(),
            conversation_id
        );
        Ok(())
    }

    async fn load(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        Ok(self
            .conversations
            .get(conversation_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        self.conversations.remove(conversation_id);
        tracing::debug!("[InMemoryStorage] Deleted '{}'", conversation_id);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        Ok(self
            .conversations
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn exists(&self, conversation_id: &str) -> Result<bool> {
        Ok(self.conversations.contains_key(conversation_id))
    }
}
