//! Startup wiring - turns `Settings` into a ready `AppState`

use crate::chat::{Advisor, ChatClient, MemoryAdvisor, SYSTEM_PROMPT};
use crate::config::{DatabaseConfig, EmbeddingProvider, MemoryConfig, Settings, StorageKind};
use crate::core::llm::LLMClient;
use crate::rag::{
    self, DogRepository, Embedder, HashEmbedder, InMemoryVectorStore, OpenAIEmbedder,
    QuestionAnswerAdvisor,
};
use crate::server::AppState;
use crate::storage::{
    ConversationStorage, FileSystemStorage, InMemoryStorage, MemoryRegistry, MessageWindowMemory,
};
use crate::tools::provider::build_registry;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Open the dog database, importing the seed file when the table is empty.
pub fn open_repository(config: &DatabaseConfig) -> Result<DogRepository> {
    let repository = DogRepository::open(&config.path)?;

    if repository.count()? == 0 {
        match &config.seed_file {
            Some(seed) if seed.exists() => {
                repository
                    .import_json(seed)
                    .with_context(|| format!("Failed to seed dogs from {:?}", seed))?;
            }
            Some(seed) => tracing::warn!("Seed file {:?} not found, starting with no dogs", seed),
            None => tracing::info!("No seed file configured, starting with no dogs"),
        }
    }

    Ok(repository)
}

pub fn build_embedder(settings: &Settings, llm: &Arc<LLMClient>) -> Arc<dyn Embedder> {
    let config = &settings.embedding;
    match config.provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::new(
            Arc::clone(llm),
            config.model.clone(),
            config.dimensions,
        )),
        EmbeddingProvider::Hash => Arc::new(HashEmbedder::new(config.dimensions)),
    }
}

pub async fn build_memory(config: &MemoryConfig) -> Result<Arc<MemoryRegistry>> {
    let storage: Arc<dyn ConversationStorage> = match config.storage {
        StorageKind::Memory => Arc::new(InMemoryStorage::new()),
        StorageKind::Filesystem => {
            Arc::new(FileSystemStorage::new(config.storage_dir.clone()).await?)
        }
    };

    let window = MessageWindowMemory::new(storage, config.max_messages);
    Ok(Arc::new(MemoryRegistry::new(window)))
}

/// Assemble the service using `OPENAI_API_KEY` for completions.
pub async fn assemble(settings: &Settings) -> Result<AppState> {
    let api_key = Settings::require_api_key()?;
    let llm = Arc::new(LLMClient::new(api_key, settings.llm.clone()));
    assemble_with(settings, llm).await
}

/// Assemble the service around an existing completion client.
pub async fn assemble_with(settings: &Settings, llm: Arc<LLMClient>) -> Result<AppState> {
    let model = llm.model().to_string();
    let repository = open_repository(&settings.database)?;

    let store = Arc::new(InMemoryVectorStore::new(build_embedder(settings, &llm)));
    rag::load_dogs(&repository, &store)
        .await
        .context("Failed to index dog listings")?;

    let tools = Arc::new(build_registry(&settings.tools).await?);
    let memories = build_memory(&settings.memory).await?;

    let advisors: Vec<Arc<dyn Advisor>> = vec![
        Arc::new(MemoryAdvisor::new(Arc::clone(&memories))),
        Arc::new(QuestionAnswerAdvisor::new(
            Arc::clone(&store),
            &settings.retrieval,
        )),
    ];

    let chat = ChatClient::builder(llm)
        .default_system(SYSTEM_PROMPT)
        .default_advisors(advisors)
        .default_tools(tools)
        .max_tool_rounds(settings.llm.max_tool_rounds)
        .build();

    tracing::info!(
        "Assistant ready: model {}, {} listings indexed, {} tools ({:?} mode)",
        model,
        store.len().await,
        chat.tools().len(),
        settings.tools.mode
    );

    Ok(AppState::new(
        Arc::new(chat),
        store,
        memories,
        settings.server.conversation_key,
        settings.tools.mode,
    ))
}
