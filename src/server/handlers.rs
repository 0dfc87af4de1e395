//! Request handlers

use super::error::ApiError;
use super::session;
use super::state::AppState;
use crate::config::{ConversationKey, ToolMode};
use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct InquireParams {
    pub question: String,
}

/// POST /{user}/inquire?question=...
pub async fn inquire(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(params): Query<InquireParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if params.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let (conversation_id, new_session) = match state.conversation_key {
        ConversationKey::User => (user.clone(), None),
        ConversationKey::Session => state.resolve_session(session::session_id(&headers)),
    };

    tracing::info!(user = %user, conversation = %conversation_id, "inquiry");

    let reply = state.chat.prompt(&params.question, &conversation_id).await?;

    let mut response = reply.into_response();
    if let Some(id) = new_session {
        response
            .headers_mut()
            .insert(SET_COOKIE, session::set_cookie(&id));
    }
    Ok(response)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub documents: usize,
    pub conversations: usize,
    pub tools: Vec<String>,
    pub tool_mode: ToolMode,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        documents: state.store.len().await,
        conversations: state.memories.len(),
        tools: state.chat.tools().tool_names(),
        tool_mode: state.tool_mode,
    })
}
