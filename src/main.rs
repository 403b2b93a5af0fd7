use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chat_timelines::{
    chat::{ChatClient, ChatSource, DirectorySource},
    cli::{execute_command, TimelineCommands},
    config::{Config, LogFormat},
    view::{TimelineView, ViewContext},
};

/// Build and inspect the timeline graph of a character's chats
#[derive(Parser, Debug)]
#[command(name = "chat-timelines", version)]
struct Cli {
    /// Read `.jsonl` chats from this directory instead of the chat server
    #[arg(long)]
    chats_dir: Option<PathBuf>,

    /// Treat the chats as group chats
    #[arg(long)]
    group: bool,

    #[command(subcommand)]
    command: TimelineCommands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(dir) = cli.chats_dir {
        config.source.chats_dir = Some(dir);
    }
    if cli.group {
        config.source.group_chat = true;
    }

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "Chat timelines starting");

    let group_chat = config.source.group_chat;
    let exit_code = match config.source.chats_dir.clone() {
        Some(dir) => {
            info!(dir = %dir.display(), "Reading chats from directory");
            let context = context_for(group_chat, dir.display().to_string());
            let source = DirectorySource::new(dir, group_chat);
            run(source, &config, context, cli.command).await?
        }
        None => {
            let client = match ChatClient::new(&config.source, config.request.clone()) {
                Ok(c) => {
                    info!(base_url = %config.source.base_url, "Chat client initialized");
                    c
                }
                Err(e) => {
                    error!(error = %e, "Failed to initialize chat client");
                    return Err(e.into());
                }
            };
            let key = config
                .source
                .character_avatar
                .clone()
                .or_else(|| config.source.character_name.clone())
                .unwrap_or_default();
            run(client, &config, context_for(group_chat, key), cli.command).await?
        }
    };

    std::process::exit(exit_code);
}

fn context_for(group_chat: bool, key: String) -> ViewContext {
    if group_chat {
        ViewContext::Group(key)
    } else {
        ViewContext::Character(key)
    }
}

async fn run<S: ChatSource>(
    source: S,
    config: &Config,
    context: ViewContext,
    command: TimelineCommands,
) -> anyhow::Result<i32> {
    let mut view = TimelineView::new(source, config.graph.clone());
    if let Err(e) = view.refresh(&context).await {
        error!(error = %e, "Failed to build timeline");
        return Err(e.into());
    }

    let result = execute_command(command, &mut view);
    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
    Ok(result.exit_code)
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
