mod settings;

pub use settings::{
    ConversationKey, DatabaseConfig, EmbeddingConfig, EmbeddingProvider, LLMConfig,
    LoggingConfig, MemoryConfig, RetrievalConfig, ServerConfig, Settings, StorageKind,
    ToolMode, ToolsConfig,
};
