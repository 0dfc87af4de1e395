//! Question-answer advisor - injects matching dog listings into the prompt

use super::vector_store::InMemoryVectorStore;
use crate::chat::{AdvisedRequest, Advisor};
use crate::config::RetrievalConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub struct QuestionAnswerAdvisor {
    store: Arc<InMemoryVectorStore>,
    top_k: usize,
    similarity_threshold: f64,
}

impl QuestionAnswerAdvisor {
    pub fn new(store: Arc<InMemoryVectorStore>, config: &RetrievalConfig) -> Self {
        Self {
            store,
            top_k: config.top_k,
            similarity_threshold: config.similarity_threshold,
        }
    }
}

#[async_trait]
impl Advisor for QuestionAnswerAdvisor {
    fn name(&self) -> &str {
        "QuestionAnswerAdvisor"
    }

    async fn before(&self, request: &mut AdvisedRequest) -> Result<()> {
        let hits = self
            .store
            .similarity_search(&request.user, self.top_k, self.similarity_threshold)
            .await?;

        tracing::debug!(
            conversation = %request.conversation_id,
            "[QuestionAnswerAdvisor] {} listings matched",
            hits.len()
        );

        request
            .context
            .extend(hits.into_iter().map(|hit| hit.document.content));
        Ok(())
    }
}
