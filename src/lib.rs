//! Pooch Palace - an AI assistant for adopting dogs
//!
//! Questions arrive over HTTP, are answered by a chat model that sees the
//! conversation so far and the dog listings most relevant to the question,
//! and may book adoption appointments through a scheduling tool that runs
//! in-process or behind an MCP server.

pub mod app;
pub mod chat;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod rag;
pub mod server;
pub mod storage;
pub mod tools;
pub mod utils;

pub use app::{assemble, assemble_with};
pub use chat::{ChatClient, ChatClientBuilder};
pub use config::Settings;
pub use server::{create_router, AppState};
pub use tools::server::{tool_server_router, ToolServerState};
