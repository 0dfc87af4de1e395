//! HTTP front end
//!
//! Information Hiding:
//! - Conversation key resolution (session cookie or path user) kept out of the chat layer
//! - Failures mapped to JSON error bodies in one place

pub mod error;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
