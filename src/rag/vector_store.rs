//! In-memory vector store with brute-force cosine similarity search.
//!
//! Filled once at startup and only read on the request path, so an `RwLock`
//! lets concurrent searches proceed in parallel.

use super::embedding::Embedder;
use anyhow::{bail, Result};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A piece of text that can be retrieved into a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>, metadata: Value) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
        }
    }
}

/// A search hit with its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}

struct Entry {
    document: Document,
    embedding: Vec<f32>,
}

pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Embed and index documents. A document whose id is already indexed
    /// replaces the earlier one.
    pub async fn add(&self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != documents.len() {
            bail!(
                "Embedder returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            );
        }

        let mut entries = self.entries.write().await;
        let added = documents.len();
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            entries.retain(|e| e.document.id != document.id);
            entries.push(Entry {
                document,
                embedding,
            });
        }

        tracing::debug!("[VectorStore] Indexed {} documents ({} total)", added, entries.len());
        Ok(added)
    }

    /// The `top_k` documents most similar to `query` scoring at least
    /// `threshold`, best first. An empty store answers without embedding
    /// the query.
    pub async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f64,
    ) -> Result<Vec<ScoredDocument>> {
        if top_k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query).await?;
        let entries = self.entries.read().await;

        let mut hits: Vec<ScoredDocument> = entries
            .iter()
            .map(|entry| ScoredDocument {
                score: cosine_similarity(&query_vector, &entry.embedding),
                document: entry.document.clone(),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Returns 0.0 for mismatched lengths or a zero-magnitude vector.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let mag_a = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}
