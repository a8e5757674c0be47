//! Vietnamese intent chatbot
//!
//! Trains the intent model at startup, probes Gemini, and serves the chat
//! API plus the browser client. The model trains in the background; chat
//! requests get 503 until it is ready.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use viet_chatbot::chat::ChatEngine;
use viet_chatbot::config::CONFIG;
use viet_chatbot::server;

#[derive(Parser)]
#[command(name = "viet-chatbot")]
#[command(about = "Vietnamese intent chatbot with Gemini delegation")]
struct Args {
    /// Address to bind (default: HOST or 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// HTTP port (default: PORT or 3000)
    #[arg(long)]
    port: Option<u16>,

    /// Intent corpus JSON replacing the built-in one
    #[arg(long, env = "INTENTS_PATH")]
    intents: Option<PathBuf>,

    /// Lexicon TOML replacing the built-in one
    #[arg(long, env = "LEXICON_PATH")]
    lexicon: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).init();

    // Resolve values: CLI args > env vars > defaults
    let mut config = CONFIG.clone();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.intents_path = args.intents.or(config.intents_path);
    config.lexicon_path = args.lexicon.or(config.lexicon_path);
    config.log_level = args.log_level;

    info!("Starting viet-chatbot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Gemini: {}",
        if config.gemini_enabled() { config.gemini_model.as_str() } else { "disabled" }
    );

    let engine = Arc::new(ChatEngine::from_config(&config)?);

    // Train in the background so the server can answer /api/status meanwhile
    let init = engine.clone();
    tokio::spawn(async move { init.initialize().await });

    server::run(engine, &config).await
}
