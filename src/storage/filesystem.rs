//! File System Conversation Storage
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Conversation ids are mapped onto safe file names
//! - Persistence mechanism independent of storage trait users

use super::ConversationStorage;
use crate::core::llm::ChatMessage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tokio::fs;

static ESCAPED_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9-]").expect("valid file name pattern"));

/// Map a conversation id to a file stem. Session ids and user names can carry
/// path separators or dots, none of which may escape the storage directory.
///
/// Every character outside `[A-Za-z0-9-]`, `_` included, becomes `_xx` per
/// UTF-8 byte, so distinct ids always get distinct files.
pub fn file_stem(conversation_id: &str) -> String {
    ESCAPED_FILE_CHARS
        .replace_all(conversation_id, |caps: &regex::Captures| {
            caps[0].bytes().map(|b| format!("_{:02x}", b)).collect::<String>()
        })
        .into_owned()
}

/// Each conversation is a JSON file at `{base_path}/{file_stem}.json`
pub struct FileSystemStorage {
    base_path: PathBuf,
}

impl FileSystemStorage {
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path)
            .await
            .with_context(|| format!("Failed to create storage directory {:?}", base_path))?;

        Ok(Self { base_path })
    }

    fn conversation_path(&self, conversation_id: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.json", file_stem(conversation_id)))
    }
}

#[async_trait]
impl ConversationStorage for FileSystemStorage {
    async fn save(&self, conversation_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let path = self.conversation_path(conversation_id);
        let json = serde_json::to_string_pretty(messages)
            .context("Failed to serialize conversation")?;

        fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write conversation file {:?}", path))?;

        tracing::debug!(
            "[FileSystemStorage] Saved {} messages for '{}' to {:?}",
            messages.len(),
            conversation_id,
            path
        );
        Ok(())
    }

    async fn load(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let path = self.conversation_path(conversation_id);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read conversation file {:?}", path))?;

        serde_json::from_str(&json)
            .with_context(|| format!("Corrupt conversation file {:?}", path))
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        let path = self.conversation_path(conversation_id);

        if path.exists() {
            fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to delete conversation file {:?}", path))?;
            tracing::debug!("[FileSystemStorage] Deleted '{}'", conversation_id);
        }

        Ok(())
    }

    /// File stems of the stored conversations.
    async fn list_sessions(&self) -> Result<Vec<String>> {
        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .context("Failed to read storage directory")?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    sessions.push(stem.to_string());
                }
            }
        }

        Ok(sessions)
    }

    async fn exists(&self, conversation_id: &str) -> Result<bool> {
        Ok(self.conversation_path(conversation_id).exists())
    }
}
