//! Embedding backends
//!
//! - `OpenAIEmbedder` calls the `/embeddings` endpoint of the completion API.
//! - `HashEmbedder` hashes words into buckets. Deterministic and offline, so
//!   the service can run without an API key and tests are reproducible.

use crate::core::llm::LLMClient;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Turns text into fixed-size vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimensions(&self) -> usize;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        match vectors.pop() {
            Some(vector) => Ok(vector),
            None => bail!("Embedder returned no vector"),
        }
    }
}

pub struct OpenAIEmbedder {
    client: Arc<LLMClient>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn new(client: Arc<LLMClient>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.client.embed(&self.model, texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Bag-of-words vectors: each lowercase word lands in one of `dimensions`
/// buckets, and the result is L2-normalized.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LLMConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64);

        let a = embedder.embed_one("Prancer is a neurotic dog").await.unwrap();
        let b = embedder.embed_one("prancer IS a neurotic dog!").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hash_embedder_blank_text_is_zero_vector() {
        let vector = HashEmbedder::new(8).embed_one("  ").await.unwrap();
        assert!(vector.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_openai_embedder_uses_configured_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [0.5, 0.5]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let settings = LLMConfig {
            base_url: server.uri(),
            max_retries: 1,
            ..Default::default()
        };
        let client = Arc::new(LLMClient::new("test-key".to_string(), settings));
        let embedder = OpenAIEmbedder::new(client, "text-embedding-3-small", 2);

        assert_eq!(embedder.embed_one("dog").await.unwrap(), vec![0.5, 0.5]);
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }
}
