//! Chat client - runs a question through the advisors, the model and its tool calls

use super::{AdvisedRequest, Advisor};
use crate::core::llm::{ChatMessage, LLMClient};
use crate::tools::registry::ToolRegistry;
use anyhow::{bail, Context, Result};
use std::sync::Arc;

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

pub struct ChatClient {
    llm: Arc<LLMClient>,
    system: String,
    advisors: Vec<Arc<dyn Advisor>>,
    tools: Arc<ToolRegistry>,
    max_tool_rounds: usize,
}

impl ChatClient {
    pub fn builder(llm: Arc<LLMClient>) -> ChatClientBuilder {
        ChatClientBuilder::new(llm)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer `question` within the conversation `conversation_id`.
    pub async fn prompt(&self, question: &str, conversation_id: &str) -> Result<String> {
        let mut request = AdvisedRequest::new(conversation_id, self.system.clone(), question);

        for advisor in &self.advisors {
            advisor
                .before(&mut request)
                .await
                .with_context(|| format!("{} failed before completion", advisor.name()))?;
        }

        let reply = self.complete(request.to_messages()).await?;

        for advisor in self.advisors.iter().rev() {
            advisor
                .after(&request, &reply)
                .await
                .with_context(|| format!("{} failed after completion", advisor.name()))?;
        }

        Ok(reply)
    }

    /// Call the model until it answers in text, executing the tools it asks for
    /// in between.
    async fn complete(&self, mut messages: Vec<ChatMessage>) -> Result<String> {
        let definitions = self.tools.definitions();
        let mut rounds = 0;

        loop {
            let reply = self.llm.complete(&messages, &definitions).await?;
            let calls = reply.requested_tools().to_vec();

            if calls.is_empty() {
                return Ok(reply.content);
            }
            if rounds == self.max_tool_rounds {
                bail!(
                    "Model still requesting tools after {} rounds",
                    self.max_tool_rounds
                );
            }
            rounds += 1;

            messages.push(reply);
            for call in calls {
                tracing::info!("[ChatClient] Model called tool: {}", call.function.name);
                let result = self
                    .tools
                    .call_json(&call.function.name, &call.function.arguments)
                    .await;
                tracing::debug!("[ChatClient] Tool result: {:?}", result);
                messages.push(ChatMessage::tool(call.id, result.into_content()));
            }
        }
    }
}

pub struct ChatClientBuilder {
    llm: Arc<LLMClient>,
    system: String,
    advisors: Vec<Arc<dyn Advisor>>,
    tools: Arc<ToolRegistry>,
    max_tool_rounds: usize,
}

impl ChatClientBuilder {
    pub fn new(llm: Arc<LLMClient>) -> Self {
        Self {
            llm,
            system: String::new(),
            advisors: Vec::new(),
            tools: Arc::new(ToolRegistry::new()),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn default_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Advisors run in the order given here.
    pub fn default_advisors(mut self, advisors: Vec<Arc<dyn Advisor>>) -> Self {
        self.advisors = advisors;
        self
    }

    pub fn default_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn build(self) -> ChatClient {
        ChatClient {
            llm: self.llm,
            system: self.system,
            advisors: self.advisors,
            tools: self.tools,
            max_tool_rounds: self.max_tool_rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LLMConfig;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Advisor for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn before(&self, _request: &mut AdvisedRequest) -> Result<()> {
            self.log.lock().unwrap().push(format!("before {}", self.name));
            Ok(())
        }

        async fn after(&self, _request: &AdvisedRequest, _reply: &str) -> Result<()> {
            self.log.lock().unwrap().push(format!("after {}", self.name));
            Ok(())
        }
    }

    fn llm_for(server: &MockServer) -> Arc<LLMClient> {
        Arc::new(LLMClient::new(
            "test-key".to_string(),
            LLMConfig {
                base_url: server.uri(),
                max_retries: 1,
                ..Default::default()
            },
        ))
    }

    fn text_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": text}}]
        }))
    }

    #[tokio::test]
    async fn test_advisors_run_before_in_order_and_after_in_reverse() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(text_reply("Woof"))
            .mount(&server)
            .await;

        let log = Arc::new(Mutex::new(Vec::new()));
        let client = ChatClient::builder(llm_for(&server))
            .default_advisors(vec![
                Arc::new(Recorder {
                    name: "memory",
                    log: Arc::clone(&log),
                }) as Arc<dyn Advisor>,
                Arc::new(Recorder {
                    name: "retrieval",
                    log: Arc::clone(&log),
                }) as Arc<dyn Advisor>,
            ])
            .build();

        assert_eq!(client.prompt("hi", "abc").await.unwrap(), "Woof");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before memory", "before retrieval", "after retrieval", "after memory"]
        );
    }

    #[tokio::test]
    async fn test_tool_rounds_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "fetch", "arguments": "{}"}
                    }]
                }}]
            })))
            .expect(3)
            .mount(&server)
            .await;

        let client = ChatClient::builder(llm_for(&server))
            .max_tool_rounds(2)
            .build();

        let err = client.prompt("loop forever", "abc").await.unwrap_err();
        assert!(err.to_string().contains("after 2 rounds"));
    }

    #[tokio::test]
    async fn test_completion_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ChatClient::builder(llm_for(&server)).build();
        assert!(client.prompt("hi", "abc").await.is_err());
    }
}
