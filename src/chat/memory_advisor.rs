//! Memory advisor - replays the conversation so far and records each turn

use super::{AdvisedRequest, Advisor};
use crate::core::llm::ChatMessage;
use crate::storage::MemoryRegistry;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub struct MemoryAdvisor {
    registry: Arc<MemoryRegistry>,
}

impl MemoryAdvisor {
    pub fn new(registry: Arc<MemoryRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Advisor for MemoryAdvisor {
    fn name(&self) -> &str {
        "MemoryAdvisor"
    }

    /// Prepend history, then record the question as asked (without any
    /// retrieved context).
    async fn before(&self, request: &mut AdvisedRequest) -> Result<()> {
        let memory = self.registry.get_or_create(&request.conversation_id);
        let mut history = memory.history().await?;

        tracing::debug!(
            conversation = %request.conversation_id,
            "[MemoryAdvisor] Replaying {} messages",
            history.len()
        );

        history.append(&mut request.history);
        request.history = history;
        memory.append(ChatMessage::user(request.user.clone())).await
    }

    async fn after(&self, request: &AdvisedRequest, reply: &str) -> Result<()> {
        self.registry
            .get_or_create(&request.conversation_id)
            .append(ChatMessage::assistant(reply))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStorage, MessageWindowMemory};

    fn registry() -> Arc<MemoryRegistry> {
        Arc::new(MemoryRegistry::new(MessageWindowMemory::new(
            Arc::new(InMemoryStorage::new()),
            10,
        )))
    }

    #[tokio::test]
    async fn test_second_turn_sees_first() {
        let registry = registry();
        let advisor = MemoryAdvisor::new(Arc::clone(&registry));

        let mut first = AdvisedRequest::new("abc", "", "my name is Josh");
        advisor.before(&mut first).await.unwrap();
        assert!(first.history.is_empty());
        advisor.after(&first, "Hi Josh!").await.unwrap();

        let mut second = AdvisedRequest::new("abc", "", "what's my name?");
        advisor.before(&mut second).await.unwrap();

        let replayed: Vec<&str> = second.history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(replayed, vec!["my name is Josh", "Hi Josh!"]);
    }

    #[tokio::test]
    async fn test_other_conversation_sees_nothing() {
        let registry = registry();
        let advisor = MemoryAdvisor::new(Arc::clone(&registry));

        let mut first = AdvisedRequest::new("alice", "", "my name is Alice");
        advisor.before(&mut first).await.unwrap();
        advisor.after(&first, "Hi Alice!").await.unwrap();

        let mut other = AdvisedRequest::new("bob", "", "what's my name?");
        advisor.before(&mut other).await.unwrap();

        assert!(other.history.is_empty());
    }
}
