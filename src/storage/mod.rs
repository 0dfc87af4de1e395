//! Conversation Memory
//!
//! Information Hiding:
//! - Storage backend hidden behind `ConversationStorage`
//! - Window trimming lives in `MessageWindowMemory`, independent of the backend
//! - Per-conversation instances and their creation race handled by `MemoryRegistry`

use crate::core::llm::ChatMessage;
use anyhow::Result;
use async_trait::async_trait;

pub mod filesystem;
pub mod memory;
pub mod registry;
pub mod window;

pub use filesystem::FileSystemStorage;
pub use memory::InMemoryStorage;
pub use registry::{ConversationMemory, MemoryRegistry};
pub use window::MessageWindowMemory;

/// Backing store for conversation transcripts, keyed by conversation id
#[async_trait]
pub trait ConversationStorage: Send + Sync {
    /// Replace the stored messages of a conversation
    async fn save(&self, conversation_id: &str, messages: &[ChatMessage]) -> Result<()>;

    /// Load the messages of a conversation, oldest first.
    /// An unknown conversation yields an empty vector.
    async fn load(&self, conversation_id: &str) -> Result<Vec<ChatMessage>>;

    async fn delete(&self, conversation_id: &str) -> Result<()>;

    async fn list_sessions(&self) -> Result<Vec<String>>;

    async fn exists(&self, conversation_id: &str) -> Result<bool> {
        Ok(!self.load(conversation_id).await?.is_empty())
    }
}
