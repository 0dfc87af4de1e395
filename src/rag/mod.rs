//! Retrieval over the dog listings
//!
//! Information Hiding:
//! - Record storage (SQLite) separated from the search index
//! - Embedding backend swappable behind `Embedder`
//! - Prompt augmentation confined to `QuestionAnswerAdvisor`

pub mod advisor;
pub mod embedding;
pub mod repository;
pub mod vector_store;

pub use advisor::QuestionAnswerAdvisor;
pub use embedding::{Embedder, HashEmbedder, OpenAIEmbedder};
pub use repository::{Dog, DogRepository};
pub use vector_store::{Document, InMemoryVectorStore, ScoredDocument};

use anyhow::Result;
use serde_json::json;

/// The indexed text for one dog.
pub fn document_for(dog: &Dog) -> Document {
    let content = format!(
        "id: {}, dog name: {}, description: up for adoptions: {}, ",
        dog.id, dog.name, dog.description
    );
    Document::new(
        dog.id.to_string(),
        content,
        json!({
            "id": dog.id,
            "name": dog.name,
        }),
    )
}

/// Index every dog in the repository. Returns the number of documents added.
pub async fn load_dogs(repository: &DogRepository, store: &InMemoryVectorStore) -> Result<usize> {
    let documents: Vec<Document> = repository.find_all()?.iter().map(document_for).collect();
    let added = store.add(documents).await?;
    tracing::info!("Indexed {} dog listings", added);
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_document_format() {
        let dog = Dog {
            id: 45,
            name: "Prancer".to_string(),
            owner: None,
            description: "A silly, neurotic dog".to_string(),
        };

        let document = document_for(&dog);
        assert_eq!(document.id, "45");
        assert_eq!(
            document.content,
            "id: 45, dog name: Prancer, description: up for adoptions: A silly, neurotic dog, "
        );
    }

    #[tokio::test]
    async fn test_empty_repository_indexes_nothing() {
        let repository = DogRepository::in_memory().unwrap();
        let store = InMemoryVectorStore::new(Arc::new(HashEmbedder::new(32)));

        assert_eq!(load_dogs(&repository, &store).await.unwrap(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_one_document_per_dog() {
        let repository = DogRepository::in_memory().unwrap();
        for (id, name) in [(1, "Rex"), (2, "Fido"), (45, "Prancer")] {
            repository
                .save(&Dog {
                    id,
                    name: name.to_string(),
                    owner: None,
                    description: "good dog".to_string(),
                })
                .unwrap();
        }
        let store = InMemoryVectorStore::new(Arc::new(HashEmbedder::new(32)));

        assert_eq!(load_dogs(&repository, &store).await.unwrap(), 3);
        assert_eq!(store.len().await, 3);
    }
}
