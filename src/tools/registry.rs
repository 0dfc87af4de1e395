//! Tool Registry
//!
//! Information Hiding:
//! - Tool storage and lookup implementation hidden
//! - Argument decoding and failure reporting centralized in `call`

use super::{Tool, ToolMetadata, ToolResult};
use crate::core::llm::ToolDefinition;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tools the chat client may offer to the model, keyed by name
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a new tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.metadata().name;
        tracing::info!("Registering tool: {}", name);
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        self.tools.values().map(|tool| tool.metadata()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function definitions for the completion request
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| {
                let metadata = tool.metadata();
                ToolDefinition::function(metadata.name, metadata.description, tool.input_schema())
            })
            .collect()
    }

    /// Run a tool by name. Unknown tools, invalid arguments and execution errors
    /// all come back as failed results so the model can see what went wrong.
    pub async fn call(&self, name: &str, args: Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            tracing::warn!("Model requested unknown tool '{}'", name);
            return ToolResult::failure(format!("Tool '{}' not found", name));
        };

        if let Err(e) = tool.validate(&args) {
            return ToolResult::failure(format!("Invalid arguments for '{}': {}", name, e));
        }

        match tool.execute(args).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Tool '{}' failed: {:#}", name, e);
                ToolResult::failure(e.to_string())
            }
        }
    }

    /// Like `call`, with the JSON-encoded argument string the completion API produces.
    pub async fn call_json(&self, name: &str, arguments: &str) -> ToolResult {
        let args = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str(arguments) {
                Ok(value) => value,
                Err(e) => {
                    return ToolResult::failure(format!(
                        "Arguments for '{}' are not valid JSON: {}",
                        name, e
                    ))
                }
            }
        };
        self.call(name, args).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
