use crate::chat::DEFAULT_CONVERSATION_ID;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pooch-palace")]
#[command(author, version, about = "Dog adoption assistant for the Pooch Palace agency", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web service (default)
    Serve {
        /// Listen port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the MCP server exposing the appointment scheduler
    ToolServer {
        /// Listen port (overrides tools.server_port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question through the full assistant pipeline
    Ask {
        question: String,

        /// Conversation the question belongs to
        #[arg(short, long, default_value = DEFAULT_CONVERSATION_ID)]
        user: String,
    },

    /// Chat with the assistant interactively
    Interactive {
        #[arg(short, long, default_value = DEFAULT_CONVERSATION_ID)]
        user: String,
    },

    /// Manage dog listings
    Dogs {
        #[command(subcommand)]
        command: DogsCommand,
    },
}

#[derive(Subcommand)]
pub enum DogsCommand {
    /// List dogs in the database
    List,

    /// Import dogs from a JSON array file
    Import { file: PathBuf },
}
