use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub embedding: EmbeddingConfig,
    pub memory: MemoryConfig,
    pub retrieval: RetrievalConfig,
    pub tools: ToolsConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Which request attribute scopes a conversation's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKey {
    /// The `SESSION` cookie, minted on first contact.
    #[default]
    Session,
    /// The `{user}` path segment.
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub conversation_key: ConversationKey,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            conversation_key: ConversationKey::Session,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_retries: u32,
    pub max_tool_rounds: usize,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            max_retries: 3,
            max_tool_rounds: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAI,
    /// Offline bag-of-words hashing, no API key required.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Filesystem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_messages: usize,
    pub storage: StorageKind,
    pub storage_dir: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            storage: StorageKind::Memory,
            storage_dir: PathBuf::from("./sessions"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub similarity_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            similarity_threshold: 0.0,
        }
    }
}

/// How the scheduling tool is wired into the chat client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    Local,
    #[default]
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub mode: ToolMode,
    pub remote_url: String,
    pub server_port: u16,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            mode: ToolMode::Remote,
            remote_url: "http://localhost:8081".to_string(),
            server_port: 8081,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file, or `:memory:`.
    pub path: String,
    /// JSON array of dogs imported when the table is empty.
    pub seed_file: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./adoptions.db".to_string(),
            seed_file: Some(PathBuf::from("data/dogs.json")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn api_key() -> Option<String> {
        env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty())
    }

    pub fn require_api_key() -> Result<String> {
        Self::api_key()
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_adoption_demo() {
        let settings = Settings::default();

        assert_eq!(settings.memory.max_messages, 10);
        assert_eq!(settings.tools.mode, ToolMode::Remote);
        assert_eq!(settings.tools.remote_url, "http://localhost:8081");
        assert_eq!(settings.server.conversation_key, ConversationKey::Session);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::builder()
            .add_source(config::File::from_str(
                "[tools]\nmode = \"local\"\n\n[memory]\nmax_messages = 4\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let settings: Settings = config.try_deserialize().unwrap();

        assert_eq!(settings.tools.mode, ToolMode::Local);
        assert_eq!(settings.memory.max_messages, 4);
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.llm.model, "gpt-4o-mini");
    }
}
