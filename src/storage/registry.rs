//! Memory registry - one conversation memory per key, created on first use

use super::window::MessageWindowMemory;
use crate::core::llm::ChatMessage;
use anyhow::Result;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The memory of a single conversation.
pub struct ConversationMemory {
    conversation_id: String,
    window: MessageWindowMemory,
    // Serializes load-append-save cycles for this conversation.
    lock: Mutex<()>,
}

impl ConversationMemory {
    fn new(conversation_id: String, window: MessageWindowMemory) -> Self {
        Self {
            conversation_id,
            window,
            lock: Mutex::new(()),
        }
    }

    pub async fn history(&self) -> Result<Vec<ChatMessage>> {
        let _guard = self.lock.lock().await;
        self.window.get(&self.conversation_id).await
    }

    pub async fn append(&self, message: ChatMessage) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.window.add(&self.conversation_id, vec![message]).await
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.window.clear(&self.conversation_id).await
    }
}

/// Conversation key to memory. Entries live until the process exits.
pub struct MemoryRegistry {
    window: MessageWindowMemory,
    memories: DashMap<String, Arc<ConversationMemory>>,
    created: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new(window: MessageWindowMemory) -> Self {
        Self {
            window,
            memories: DashMap::new(),
            created: AtomicUsize::new(0),
        }
    }

    /// Return the memory for `conversation_id`, creating it if this is the
    /// first request for that key. Racing first requests get the same instance.
    pub fn get_or_create(&self, conversation_id: &str) -> Arc<ConversationMemory> {
        if let Some(existing) = self.memories.get(conversation_id) {
            return Arc::clone(existing.value());
        }

        let entry = self
            .memories
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                self.created.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("[MemoryRegistry] New conversation '{}'", conversation_id);
                Arc::new(ConversationMemory::new(
                    conversation_id.to_string(),
                    self.window.clone(),
                ))
            });
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// How many memories have ever been created.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileSystemStorage, InMemoryStorage};

    fn registry() -> MemoryRegistry {
        MemoryRegistry::new(MessageWindowMemory::new(
            Arc::new(InMemoryStorage::new()),
            10,
        ))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_creates_one_memory() {
        let registry = Arc::new(registry());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get_or_create("abc") })
            })
            .collect();

        let mut memories = Vec::new();
        for handle in handles {
            memories.push(handle.await.unwrap());
        }

        assert!(memories.iter().all(|m| Arc::ptr_eq(m, &memories[0])));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.created(), 1);
    }

    #[tokio::test]
    async fn test_memories_of_distinct_users_are_independent() {
        let registry = registry();

        registry
            .get_or_create("alice")
            .append(ChatMessage::user("my name is Alice"))
            .await
            .unwrap();

        assert!(registry.get_or_create("bob").history().await.unwrap().is_empty());
        assert_eq!(
            registry.get_or_create("alice").history().await.unwrap()[0].content,
            "my name is Alice"
        );
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_forgets_one_conversation() {
        let registry = registry();
        registry
            .get_or_create("alice")
            .append(ChatMessage::user("hi"))
            .await
            .unwrap();
        registry
            .get_or_create("bob")
            .append(ChatMessage::user("hello"))
            .await
            .unwrap();

        registry.get_or_create("alice").clear().await.unwrap();

        assert!(registry.get_or_create("alice").history().await.unwrap().is_empty());
        assert_eq!(registry.get_or_create("bob").history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_backed_keys_stay_independent() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = FileSystemStorage::new(dir.path().to_path_buf()).await.unwrap();
        let registry = MemoryRegistry::new(MessageWindowMemory::new(Arc::new(storage), 10));

        registry
            .get_or_create("john.doe")
            .append(ChatMessage::user("secret of john.doe"))
            .await
            .unwrap();

        assert!(registry
            .get_or_create("john_doe")
            .history()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let registry = Arc::new(registry());
        let memory = registry.get_or_create("abc");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let memory = Arc::clone(&memory);
                tokio::spawn(async move { memory.append(ChatMessage::user(i.to_string())).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(memory.history().await.unwrap().len(), 8);
    }
}
