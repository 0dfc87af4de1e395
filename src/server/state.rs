//! Application state shared across route handlers.

use crate::chat::ChatClient;
use crate::config::{ConversationKey, ToolMode};
use crate::rag::InMemoryVectorStore;
use crate::storage::MemoryRegistry;
use dashmap::DashSet;
use std::sync::Arc;
use std::time::Instant;

/// Every field is an `Arc` or `Copy`, so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatClient>,
    pub store: Arc<InMemoryVectorStore>,
    pub memories: Arc<MemoryRegistry>,
    pub conversation_key: ConversationKey,
    /// Session ids this process has handed out in `SESSION` cookies.
    pub sessions: Arc<DashSet<String>>,
    pub tool_mode: ToolMode,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        chat: Arc<ChatClient>,
        store: Arc<InMemoryVectorStore>,
        memories: Arc<MemoryRegistry>,
        conversation_key: ConversationKey,
        tool_mode: ToolMode,
    ) -> Self {
        Self {
            chat,
            store,
            memories,
            conversation_key,
            sessions: Arc::new(DashSet::new()),
            tool_mode,
            start_time: Instant::now(),
        }
    }

    /// The conversation for a session cookie, or a freshly issued session
    /// when the cookie is absent or was never issued here. The second value
    /// is set only for a new session.
    pub fn resolve_session(&self, presented: Option<String>) -> (String, Option<String>) {
        if let Some(id) = presented {
            if self.sessions.contains(&id) {
                return (id, None);
            }
            tracing::debug!("Ignoring unknown session id");
        }

        let id = super::session::new_session_id();
        self.sessions.insert(id.clone());
        (id.clone(), Some(id))
    }
}
