//! `SESSION` cookie handling for session-scoped conversations

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};

pub const SESSION_COOKIE: &str = "SESSION";

/// The session id carried by the request, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn set_cookie(session_id: &str) -> HeaderValue {
    // uuid output is always a valid header value
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session_id
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("SESSION=; Path=/"))
}
