//! Tool wiring - decides where the scheduling tool runs

use super::registry::ToolRegistry;
use super::scheduler::DogAdoptionSchedulerTool;
use crate::config::{ToolMode, ToolsConfig};
use crate::core::mcp::{discover_mcp_tools, MCPClient};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Registry for the tool server process: always the in-process scheduler.
pub fn local_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DogAdoptionSchedulerTool::new()));
    registry
}

/// Build the registry the chat client offers to the model.
///
/// In remote mode the MCP server must be reachable; a failed connection or
/// handshake aborts startup.
pub async fn build_registry(config: &ToolsConfig) -> Result<ToolRegistry> {
    match config.mode {
        ToolMode::Local => {
            tracing::info!("Using local scheduling tool");
            Ok(local_registry())
        }
        ToolMode::Remote => {
            let client = MCPClient::connect(&config.remote_url)
                .await
                .with_context(|| format!("Failed to connect to MCP server at {}", config.remote_url))?;

            let mut registry = ToolRegistry::new();
            for tool in discover_mcp_tools(Arc::new(client)).await? {
                registry.register(tool);
            }

            if registry.is_empty() {
                tracing::warn!("MCP server at {} offered no tools", config.remote_url);
            }
            Ok(registry)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::scheduler::SCHEDULE_APPOINTMENT;

    #[tokio::test]
    async fn test_local_mode_registers_scheduler() {
        let config = ToolsConfig {
            mode: ToolMode::Local,
            ..Default::default()
        };

        let registry = build_registry(&config).await.unwrap();
        assert_eq!(registry.tool_names(), vec![SCHEDULE_APPOINTMENT.to_string()]);
    }

    #[tokio::test]
    async fn test_remote_mode_fails_when_server_unreachable() {
        let config = ToolsConfig {
            mode: ToolMode::Remote,
            remote_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };

        let err = build_registry(&config).await.unwrap_err();
        assert!(err.to_string().contains("Failed to connect"));
    }
}
