//! Message window - keeps the most recent messages of each conversation

use super::ConversationStorage;
use crate::core::llm::ChatMessage;
use anyhow::Result;
use std::sync::Arc;

pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// Bounded view over a `ConversationStorage`. Once a conversation exceeds
/// `max_messages`, the oldest messages are dropped first.
#[derive(Clone)]
pub struct MessageWindowMemory {
    storage: Arc<dyn ConversationStorage>,
    max_messages: usize,
}

impl MessageWindowMemory {
    pub fn new(storage: Arc<dyn ConversationStorage>, max_messages: usize) -> Self {
        Self {
            storage,
            max_messages: max_messages.max(1),
        }
    }

    pub async fn get(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        self.storage.load(conversation_id).await
    }

    pub async fn add(&self, conversation_id: &str, messages: Vec<ChatMessage>) -> Result<()> {
        let mut window = self.storage.load(conversation_id).await?;
        window.extend(messages);

        if window.len() > self.max_messages {
            let evicted = window.len() - self.max_messages;
            window.drain(..evicted);
            tracing::debug!(
                "[MessageWindowMemory] Evicted {} messages from '{}'",
                evicted,
                conversation_id
            );
        }

        self.storage.save(conversation_id, &window).await
    }

    pub async fn clear(&self, conversation_id: &str) -> Result<()> {
        self.storage.delete(conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn window(max: usize) -> MessageWindowMemory {
        MessageWindowMemory::new(Arc::new(InMemoryStorage::new()), max)
    }

    #[tokio::test]
    async fn test_window_evicts_oldest_first() {
        let memory = window(3);

        for i in 0..5 {
            memory
                .add("abc", vec![ChatMessage::user(format!("message {}", i))])
                .await
                .unwrap();
        }

        let kept: Vec<String> = memory
            .get("abc")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(kept, vec!["message 2", "message 3", "message 4"]);
    }

    #[tokio::test]
    async fn test_window_never_exceeds_max_in_one_add() {
        let memory = window(DEFAULT_MAX_MESSAGES);
        let batch = (0..25)
            .map(|i| ChatMessage::assistant(i.to_string()))
            .collect();

        memory.add("abc", batch).await.unwrap();

        let kept = memory.get("abc").await.unwrap();
        assert_eq!(kept.len(), DEFAULT_MAX_MESSAGES);
        assert_eq!(kept[0].content, "15");
    }

    #[tokio::test]
    async fn test_clear() {
        let memory = window(4);
        memory.add("abc", vec![ChatMessage::user("hi")]).await.unwrap();

        memory.clear("abc").await.unwrap();
        assert!(memory.get("abc").await.unwrap().is_empty());
    }
}
