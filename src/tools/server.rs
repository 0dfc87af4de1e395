//! MCP tool server over HTTP + Server-Sent-Events
//!
//! Serves a `ToolRegistry` to remote chat clients. Each `GET /sse` opens a
//! session whose first event names the endpoint for that session's JSON-RPC
//! requests; results are pushed back down the session's event stream.

use super::registry::ToolRegistry;
use crate::core::mcp::PROTOCOL_VERSION;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use futures::stream::{self, Stream};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

const SESSION_BUFFER: usize = 32;

type Sessions = DashMap<String, mpsc::Sender<Event>>;

#[derive(Clone)]
pub struct ToolServerState {
    registry: Arc<ToolRegistry>,
    sessions: Arc<Sessions>,
}

impl ToolServerState {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageParams {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

pub fn tool_server_router(state: ToolServerState) -> Router {
    Router::new()
        .route("/sse", get(open_session))
        .route("/message", post(post_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Removes its session from the table when the event stream is dropped.
struct SessionGuard {
    session_id: String,
    sessions: Arc<Sessions>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.sessions.remove(&self.session_id).is_some() {
            tracing::info!(session = %self.session_id, "MCP session closed");
        }
    }
}

/// Register a session and return its event stream: the endpoint event, then
/// every reply posted to the session.
fn session_events(
    sessions: &Arc<Sessions>,
    session_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let (tx, rx) = mpsc::channel(SESSION_BUFFER);
    sessions.insert(session_id.clone(), tx);

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/message?sessionId={}", session_id));

    let guard = SessionGuard {
        session_id,
        sessions: Arc::clone(sessions),
    };
    let responses = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv()
            .await
            .map(|event| (Ok::<_, Infallible>(event), (rx, guard)))
    });

    stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(responses)
}

/// GET /sse - open an event stream and announce the session's message endpoint.
async fn open_session(
    State(state): State<ToolServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(session = %session_id, "MCP session opened");

    Sse::new(session_events(&state.sessions, session_id)).keep_alive(KeepAlive::default())
}

/// POST /message - accept a JSON-RPC message for a session.
async fn post_message(
    State(state): State<ToolServerState>,
    Query(params): Query<MessageParams>,
    Json(request): Json<RpcRequest>,
) -> Response {
    let Some(sender) = state
        .sessions
        .get(&params.session_id)
        .map(|entry| entry.value().clone())
    else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    tracing::debug!(session = %params.session_id, method = %request.method, "MCP message");

    // Notifications carry no id and get no reply.
    let Some(id) = request.id else {
        return StatusCode::ACCEPTED.into_response();
    };

    let reply = match dispatch(&state.registry, &request.method, request.params).await {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }),
    };

    let event = Event::default().event("message").data(reply.to_string());
    if sender.send(event).await.is_err() {
        state.sessions.remove(&params.session_id);
        return (StatusCode::GONE, "session closed").into_response();
    }

    StatusCode::ACCEPTED.into_response()
}

async fn dispatch(
    registry: &ToolRegistry,
    method: &str,
    params: Value,
) -> Result<Value, (i64, String)> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": "pooch-palace-scheduler",
                "version": env!("CARGO_PKG_VERSION")
            }
        })),
        "ping" => Ok(json!({})),
        "tools/list" => {
            let tools: Vec<Value> = registry
                .tool_names()
                .iter()
                .filter_map(|name| registry.get(name))
                .map(|tool| {
                    let metadata = tool.metadata();
                    json!({
                        "name": metadata.name,
                        "description": metadata.description,
                        "inputSchema": tool.input_schema()
                    })
                })
                .collect();
            Ok(json!({ "tools": tools }))
        }
        "tools/call" => {
            let name = params["name"]
                .as_str()
                .ok_or_else(|| (-32602, "missing tool name".to_string()))?;
            let arguments = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));

            let result = registry.call(name, arguments).await;
            let is_error = !result.success;
            let text = if is_error {
                result.error.unwrap_or_default()
            } else {
                result.output
            };

            Ok(json!({
                "content": [{"type": "text", "text": text}],
                "isError": is_error
            }))
        }
        other => Err((-32601, format!("method not found: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::scheduler::{DogAdoptionSchedulerTool, SCHEDULE_APPOINTMENT};

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DogAdoptionSchedulerTool::new()));
        registry
    }

    #[tokio::test]
    async fn test_dispatch_lists_tools_with_schema() {
        let result = dispatch(&registry(), "tools/list", json!({})).await.unwrap();

        assert_eq!(result["tools"][0]["name"], SCHEDULE_APPOINTMENT);
        assert_eq!(result["tools"][0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_dispatch_reports_tool_failure_as_is_error() {
        let result = dispatch(
            &registry(),
            "tools/call",
            json!({"name": SCHEDULE_APPOINTMENT, "arguments": {"dogName": "Prancer"}}),
        )
        .await
        .unwrap();

        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_dropped_stream_removes_session() {
        let state = ToolServerState::new(Arc::new(registry()));
        let mut events = Box::pin(session_events(&state.sessions, "abc".to_string()));

        let endpoint = events.next().await.unwrap();
        assert!(endpoint.is_ok());
        assert_eq!(state.session_count(), 1);

        drop(events);
        assert_eq!(state.session_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let err = dispatch(&registry(), "resources/list", json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.0, -32601);
    }
}
