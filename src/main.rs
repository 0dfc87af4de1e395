use anyhow::{Context, Result};
use clap::Parser;
use pooch_palace::cli::{Cli, Commands, DogsCommand};
use pooch_palace::tools::provider::local_registry;
use pooch_palace::{app, utils, Settings, ToolServerState};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => handle_serve(settings, port).await,
        Commands::ToolServer { port } => handle_tool_server(settings, port).await,
        Commands::Ask { question, user } => handle_ask(settings, question, user).await,
        Commands::Interactive { user } => handle_interactive(settings, user).await,
        Commands::Dogs { command } => match command {
            DogsCommand::List => handle_dogs_list(settings),
            DogsCommand::Import { file } => handle_dogs_import(settings, file),
        },
    }
}

async fn handle_serve(settings: Settings, port: Option<u16>) -> Result<()> {
    let state = app::assemble(&settings).await?;
    let router = pooch_palace::create_router(state);

    let addr = format!("{}:{}", settings.server.host, port.unwrap_or(settings.server.port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Pooch Palace assistant listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn handle_tool_server(settings: Settings, port: Option<u16>) -> Result<()> {
    let registry = local_registry();
    for metadata in registry.list_tools() {
        tracing::info!("Serving tool {}", metadata);
    }

    let state = ToolServerState::new(Arc::new(registry));
    let router = pooch_palace::tool_server_router(state);

    let addr = format!("{}:{}", settings.server.host, port.unwrap_or(settings.tools.server_port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("MCP scheduler server listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn handle_ask(settings: Settings, question: String, user: String) -> Result<()> {
    let state = app::assemble(&settings).await?;

    utils::print_info("Asking the assistant...");
    let reply = state.chat.prompt(&question, &user).await?;

    println!("\n{}", reply);
    Ok(())
}

async fn handle_interactive(settings: Settings, user: String) -> Result<()> {
    let state = app::assemble(&settings).await?;

    utils::print_header("Pooch Palace Assistant");
    utils::print_info(&format!("Conversation: {}", user));
    utils::print_info("Type your questions, /clear to start over (Ctrl+C to exit)\n");

    let mut reader = BufReader::new(io::stdin());

    loop {
        utils::print_prompt("You: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            return Ok(());
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/clear" {
            state.memories.get_or_create(&user).clear().await?;
            utils::print_success("Conversation cleared");
            continue;
        }

        match state.chat.prompt(input, &user).await {
            Ok(reply) => println!("{}\n", reply),
            Err(e) => utils::print_error(&format!("Error: {:#}", e)),
        }
    }
}

fn handle_dogs_list(settings: Settings) -> Result<()> {
    let repository = app::open_repository(&settings.database)?;
    let dogs = repository.find_all()?;

    utils::print_header(&format!("{} dogs", dogs.len()));
    for dog in &dogs {
        utils::print_dog(dog);
    }
    Ok(())
}

fn handle_dogs_import(settings: Settings, file: PathBuf) -> Result<()> {
    let repository = app::open_repository(&settings.database)?;
    let imported = repository.import_json(&file)?;

    utils::print_success(&format!("Imported {} dogs from {}", imported, file.display()));
    Ok(())
}
