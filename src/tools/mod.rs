//! Tool System - callable actions the model may invoke mid-conversation
//!
//! Information Hiding:
//! - Tool execution details hidden behind trait
//! - Whether a tool runs in-process or on a remote MCP server is invisible to callers
//! - Parameter schemas derived from metadata unless a tool supplies its own

pub mod macros;
pub mod provider;
pub mod registry;
pub mod scheduler;
pub mod server;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Tool parameter schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

/// Tool metadata - describes what the tool does and how to call it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    /// JSON schema object for the parameters, as the completion API and MCP expect.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type,
                    "description": param.description,
                }),
            );
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl fmt::Display for ToolMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Text handed back to the model as the tool message.
    pub fn into_content(self) -> String {
        if self.success {
            self.output
        } else {
            format!("Error: {}", self.error.unwrap_or_default())
        }
    }
}

/// Tool trait - implemented by local tools and by remote MCP tool proxies
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get tool metadata (name, description, parameters)
    fn metadata(&self) -> ToolMetadata;

    /// JSON schema for the arguments. Remote tools return the server's schema verbatim.
    fn input_schema(&self) -> Value {
        self.metadata().input_schema()
    }

    /// Execute the tool with given arguments
    async fn execute(&self, args: Value) -> Result<ToolResult>;

    /// Validate arguments before execution (optional)
    fn validate(&self, _args: &Value) -> Result<()> {
        Ok(())
    }
}
