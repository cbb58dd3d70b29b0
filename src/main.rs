//! Musebot - Command-driven AI assistant with conversational memory
//!
//! The binary wires the real collaborators together and runs a line-oriented
//! transport over stdin/stdout. Richer transports plug in at the same
//! `CommandRouter::dispatch` seam.

use anyhow::Result;
use clap::{Parser, Subcommand};
use musebot::{
    backend::{HttpFetcher, OpenAiClient},
    chat::ChatOrchestrator,
    config::MusebotConfig,
    context::ContextStore,
    handlers::{CommandRouter, Reply},
    images::{ArtifactIndex, ImagePipeline, PromptUrlLog},
    storage::{FsBlobStore, MemoryKv},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "musebot")]
#[command(version)]
#[command(about = "Command-driven AI assistant with conversational memory and image generation")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MUSEBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the assistant on a stdin/stdout transport
    Run {
        /// Conversation key for this session
        #[arg(long, default_value = "local")]
        conversation: String,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },

    /// Run diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("musebot={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &cli.config {
        Some(config_path) => MusebotConfig::load(config_path)?,
        None => MusebotConfig::default(),
    };

    match cli.command {
        Commands::Run { conversation } => run(config, conversation).await?,
        Commands::Config { default } => show_config(if default { None } else { Some(&config) })?,
        Commands::Doctor => run_doctor(&config).await?,
    }

    Ok(())
}

async fn build_router(config: &MusebotConfig) -> Result<CommandRouter> {
    let kv = Arc::new(MemoryKv::new());
    let contexts = Arc::new(ContextStore::new(
        kv.clone(),
        config.chat.system_preamble.clone(),
    ));

    let client = Arc::new(OpenAiClient::from_config(&config.backend));
    let orchestrator = Arc::new(ChatOrchestrator::new(
        contexts,
        client.clone(),
        config.deadlines.clone(),
        &config.chat,
    ));

    let blobs = Arc::new(FsBlobStore::new(config.storage.blob_dir.clone()).await?);
    let index = Arc::new(ArtifactIndex::open(config.storage.data_dir.clone()).await?);
    let pipeline = Arc::new(ImagePipeline::new(
        client,
        Arc::new(HttpFetcher::new()),
        blobs,
        index.clone(),
        config.deadlines.clone(),
    ));
    let url_log = Arc::new(PromptUrlLog::new(kv));

    Ok(CommandRouter::new(
        orchestrator,
        pipeline,
        index,
        url_log,
        config.storage.artifact_mode,
    ))
}

async fn run(config: MusebotConfig, conversation: String) -> Result<()> {
    tracing::info!("starting musebot");
    let router = build_router(&config).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"musebot ready, /help for commands\n> ").await?;
    stdout.flush().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    stdout.write_all(b"> ").await?;
                    stdout.flush().await?;
                    continue;
                }

                let output = match router.dispatch(&conversation, &line).await {
                    Reply::Text(text) => text,
                    Reply::Photo { bytes, caption } => {
                        format!("[image, {} bytes] {caption}", bytes.len())
                    }
                };
                stdout.write_all(format!("{output}\n> ").as_bytes()).await?;
                stdout.flush().await?;
            }
        }
    }

    Ok(())
}

fn show_config(config: Option<&MusebotConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");
    Ok(())
}

async fn run_doctor(config: &MusebotConfig) -> Result<()> {
    println!("musebot doctor");
    println!();

    println!("Checking data directories...");
    for dir in [&config.storage.data_dir, &config.storage.blob_dir] {
        if dir.exists() {
            println!("  ok {}", dir.display());
        } else {
            println!("  missing {} (created on first run)", dir.display());
        }
    }

    println!();
    println!("Checking backend reachability...");
    let client = reqwest::Client::new();
    match client
        .head(config.backend.base_url.as_str())
        .timeout(config.deadlines.short())
        .send()
        .await
    {
        // Any HTTP status means the host answered
        Ok(response) => println!("  ok {} ({})", config.backend.base_url, response.status()),
        Err(e) => println!("  unreachable {} ({e})", config.backend.base_url),
    }

    if std::env::var(&config.backend.api_key_env).is_err() {
        println!();
        println!("  note: {} is not set", config.backend.api_key_env);
    }

    println!();
    println!("Doctor check complete!");
    Ok(())
}
