//! MCP client over the HTTP + Server-Sent-Events transport
//!
//! The client opens one long-lived `GET /sse` stream, learns the message
//! endpoint from the server's first `endpoint` event, then POSTs JSON-RPC
//! requests to that endpoint. Responses arrive on the stream and are routed
//! back to the waiting caller by request id, so concurrent tool calls share
//! one connection.

use crate::error::MCPError;
use crate::tools::{Tool, ToolMetadata, ToolParameter, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPTool {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default = "default_input_schema")]
    pub input_schema: Value,
}

fn default_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

#[derive(Debug, Deserialize)]
struct MCPResponse {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<MCPErrorObject>,
}

#[derive(Debug, Deserialize)]
struct MCPErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CallToolResult {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(rename = "isError", default)]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

type PendingRequests = DashMap<u64, oneshot::Sender<MCPResponse>>;
type ServerEvents = BoxStream<'static, Result<Event, EventStreamError<reqwest::Error>>>;

pub struct MCPClient {
    http: Client,
    message_endpoint: Url,
    pending: Arc<PendingRequests>,
    closed: Arc<AtomicBool>,
    request_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl MCPClient {
    /// Connect to a server at `base_url`, e.g. `http://localhost:8081`, and run
    /// the `initialize` handshake.
    pub async fn connect(base_url: &str) -> Result<Self, MCPError> {
        let http = Client::new();
        let sse_url = format!("{}/sse", base_url.trim_end_matches('/'));

        tracing::info!("Connecting to MCP server at {}", sse_url);

        let response = http
            .get(&sse_url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        let mut events: ServerEvents = response.bytes_stream().eventsource().boxed();
        let endpoint = loop {
            match events.next().await {
                Some(Ok(event)) if event.event == "endpoint" => break event.data,
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(MCPError::Stream(e.to_string())),
                None => return Err(MCPError::Closed),
            }
        };
        let message_endpoint = resolve_endpoint(&sse_url, &endpoint)?;

        tracing::debug!("MCP message endpoint: {}", message_endpoint);

        let pending = Arc::new(PendingRequests::new());
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(route_responses(
            events,
            Arc::clone(&pending),
            Arc::clone(&closed),
        ));

        let client = Self {
            http,
            message_endpoint,
            pending,
            closed,
            request_id: AtomicU64::new(0),
            reader,
        };

        client.initialize().await?;
        Ok(client)
    }

    async fn initialize(&self) -> Result<(), MCPError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
            .await?;

        tracing::info!(
            server = %result["serverInfo"]["name"].as_str().unwrap_or("unknown"),
            "MCP session initialized"
        );

        self.notify("notifications/initialized").await
    }

    pub async fn list_tools(&self) -> Result<Vec<MCPTool>, MCPError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        Ok(serde_json::from_value(tools)?)
    }

    /// Invoke a tool. A tool-level failure (`isError`) is a failed `ToolResult`,
    /// not an `Err`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult, MCPError> {
        let result = self
            .request(
                "tools/call",
                json!({
                    "name": name,
                    "arguments": arguments
                }),
            )
            .await?;

        let call: CallToolResult = serde_json::from_value(result)?;
        let text = call
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        if call.is_error {
            Ok(ToolResult::failure(text))
        } else {
            Ok(ToolResult::success(text))
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, MCPError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        // Checked after inserting: a reader that closes later clears this waiter.
        if self.closed.load(Ordering::SeqCst) {
            self.pending.remove(&id);
            return Err(MCPError::Closed);
        }

        let message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        if let Err(e) = self.post(&message).await {
            self.pending.remove(&id);
            return Err(e);
        }

        let response = rx.await.map_err(|_| MCPError::Closed)?;
        match (response.result, response.error) {
            (_, Some(error)) => Err(MCPError::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }

    async fn notify(&self, method: &str) -> Result<(), MCPError> {
        self.post(&json!({
            "jsonrpc": "2.0",
            "method": method
        }))
        .await
    }

    async fn post(&self, message: &Value) -> Result<(), MCPError> {
        self.http
            .post(self.message_endpoint.clone())
            .json(message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Drop for MCPClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn resolve_endpoint(sse_url: &str, endpoint: &str) -> Result<Url, MCPError> {
    let invalid = |reason: String| MCPError::Endpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let base = Url::parse(sse_url).map_err(|e| invalid(e.to_string()))?;
    base.join(endpoint.trim()).map_err(|e| invalid(e.to_string()))
}

/// Drain the event stream, handing each response to the caller waiting on its id.
async fn route_responses(
    mut events: ServerEvents,
    pending: Arc<PendingRequests>,
    closed: Arc<AtomicBool>,
) {
    while let Some(next) = events.next().await {
        let event = match next {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("MCP event stream failed: {}", e);
                break;
            }
        };

        if event.event != "message" && !event.event.is_empty() {
            continue;
        }

        match serde_json::from_str::<MCPResponse>(&event.data) {
            Ok(response) => {
                let waiter = response.id.and_then(|id| pending.remove(&id));
                match waiter {
                    Some((_, tx)) => {
                        let _ = tx.send(response);
                    }
                    None => tracing::debug!("Ignoring unsolicited MCP message"),
                }
            }
            Err(e) => tracing::warn!("Undecodable MCP message: {}", e),
        }
    }

    tracing::warn!("MCP event stream closed");
    closed.store(true, Ordering::SeqCst);
    // Dropping the senders wakes every waiter with `MCPError::Closed`.
    pending.clear();
}

// ============================================================================
// MCP Tool Wrapper - makes a remote tool usable through the `Tool` trait
// ============================================================================

/// Forwards calls for one discovered tool over a shared client connection.
pub struct MCPToolWrapper {
    client: Arc<MCPClient>,
    tool: MCPTool,
}

impl MCPToolWrapper {
    pub fn new(client: Arc<MCPClient>, tool: MCPTool) -> Self {
        Self { client, tool }
    }
}

#[async_trait]
impl Tool for MCPToolWrapper {
    fn metadata(&self) -> ToolMetadata {
        let schema = &self.tool.input_schema;
        let required: Vec<&str> = schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let parameters = schema
            .get("properties")
            .and_then(|props| props.as_object())
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| ToolParameter {
                        name: name.clone(),
                        param_type: prop
                            .get("type")
                            .and_then(|t| t.as_str())
                            .unwrap_or("string")
                            .to_string(),
                        description: prop
                            .get("description")
                            .and_then(|d| d.as_str())
                            .unwrap_or("")
                            .to_string(),
                        required: required.contains(&name.as_str()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        ToolMetadata {
            name: self.tool.name.clone(),
            description: self.tool.description.clone().unwrap_or_default(),
            parameters,
        }
    }

    fn input_schema(&self) -> Value {
        self.tool.input_schema.clone()
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        tracing::debug!("Forwarding '{}' to MCP server", self.tool.name);
        Ok(self.client.call_tool(&self.tool.name, args).await?)
    }
}

/// Discover all tools on a connected server and wrap each one.
pub async fn discover_mcp_tools(client: Arc<MCPClient>) -> Result<Vec<Arc<dyn Tool>>> {
    let tools = client.list_tools().await?;

    tracing::info!("Found {} tools on MCP server", tools.len());

    Ok(tools
        .into_iter()
        .map(|tool| {
            tracing::debug!("Wrapping MCP tool: {}", tool.name);
            Arc::new(MCPToolWrapper::new(Arc::clone(&client), tool)) as Arc<dyn Tool>
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_endpoint() {
        let url = resolve_endpoint("http://localhost:8081/sse", "/message?sessionId=abc").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8081/message?sessionId=abc");
    }

    #[test]
    fn test_resolve_absolute_endpoint() {
        let url = resolve_endpoint("http://localhost:8081/sse", "http://tools:9000/mcp").unwrap();
        assert_eq!(url.as_str(), "http://tools:9000/mcp");
    }

    #[test]
    fn test_tool_without_schema_gets_empty_object() {
        let tool: MCPTool = serde_json::from_value(json!({"name": "ping"})).unwrap();

        assert_eq!(tool.input_schema["type"], "object");
        assert!(tool.description.is_none());
    }

    #[test]
    fn test_call_result_text_blocks() {
        let call: CallToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "\"2025-03-04T10:15:00Z\""}],
            "isError": false
        }))
        .unwrap();

        assert!(!call.is_error);
        assert_eq!(call.content[0].text.as_deref(), Some("\"2025-03-04T10:15:00Z\""));
    }

    #[tokio::test]
    async fn test_closed_stream_fails_requests() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "event: endpoint\ndata: /message?sessionId=abc\n\n",
                "text/event-stream",
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            MCPClient::connect(&server.uri()),
        )
        .await
        .expect("connect must not hang");

        assert!(matches!(result, Err(MCPError::Closed)));
    }
}
