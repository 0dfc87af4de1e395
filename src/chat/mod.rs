//! Chat orchestration
//!
//! Information Hiding:
//! - Prompt assembly is a pipeline of advisors over an `AdvisedRequest`
//! - The tool-call loop lives in `ChatClient`; advisors never see tool traffic
//! - Callers hand in a question and a conversation id and get text back

pub mod client;
pub mod memory_advisor;
pub mod prompt;

pub use client::{ChatClient, ChatClientBuilder};
pub use memory_advisor::MemoryAdvisor;
pub use prompt::SYSTEM_PROMPT;

use crate::core::llm::ChatMessage;
use anyhow::Result;
use async_trait::async_trait;

/// Conversation used when the caller names none.
pub const DEFAULT_CONVERSATION_ID: &str = "default";

const CONTEXT_TEMPLATE: &str = "Context information is below, surrounded by ---------------------

---------------------
{context}
---------------------

Given the context and provided history information and not prior knowledge,
reply to the user comment. If the answer is not in the context, inform
the user that you can't answer the question.";

/// The request as it flows through the advisors.
#[derive(Debug, Clone)]
pub struct AdvisedRequest {
    pub conversation_id: String,
    pub system: String,
    /// Prior turns, oldest first.
    pub history: Vec<ChatMessage>,
    /// The question exactly as asked.
    pub user: String,
    /// Retrieved passages appended to the user message.
    pub context: Vec<String>,
}

impl AdvisedRequest {
    pub fn new(
        conversation_id: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            system: system.into(),
            history: Vec::new(),
            user: user.into(),
            context: Vec::new(),
        }
    }

    /// The user message sent to the model. Without retrieved context it is
    /// the question unchanged.
    pub fn user_text(&self) -> String {
        if self.context.is_empty() {
            return self.user.clone();
        }
        let context = CONTEXT_TEMPLATE.replace("{context}", &self.context.join("\n"));
        format!("{}\n\n{}", self.user, context)
    }

    /// System prompt, history, then the (possibly augmented) user message.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if !self.system.is_empty() {
            messages.push(ChatMessage::system(self.system.clone()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(self.user_text()));
        messages
    }
}

/// A step in the request pipeline. `before` hooks run in registration order
/// ahead of the completion; `after` hooks run in reverse order once the final
/// reply is known.
#[async_trait]
pub trait Advisor: Send + Sync {
    fn name(&self) -> &str;

    async fn before(&self, request: &mut AdvisedRequest) -> Result<()>;

    async fn after(&self, _request: &AdvisedRequest, _reply: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_text_without_context_is_unchanged() {
        let request = AdvisedRequest::new("abc", "system", "do you have any neurotic dogs?");
        assert_eq!(request.user_text(), "do you have any neurotic dogs?");
    }

    #[test]
    fn test_to_messages_orders_system_history_user() {
        let mut request = AdvisedRequest::new("abc", "be helpful", "and his name?");
        request.history = vec![
            ChatMessage::user("any neurotic dogs?"),
            ChatMessage::assistant("Yes, one."),
        ];
        request.context = vec!["id: 45, dog name: Prancer, ".to_string()];

        let messages = request.to_messages();
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();

        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert!(messages[3].content.starts_with("and his name?"));
        assert!(messages[3].content.contains("dog name: Prancer"));
    }
}
