//! Chef Eva web server.
//!
//! Serves the chat, recipe and menu API for a browser front end.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_KEY=sk-... cargo run -p chefeva-web
//! OPENROUTER_KEY=sk-... cargo run -p chefeva-web -- --port 8080 --language Deutsch
//! OPENROUTER_KEY=sk-... cargo run -p chefeva-web -- --static-dir web/out
//! ```
//!
//! **REST** (`POST /api/chat`):
//! ```json
//! {"message": "I have leeks and potatoes, what can I make?"}
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chefeva::prelude::*;
use chefeva::{API_KEY_ENV, DEFAULT_MODEL};
use chefeva_web::{AppState, WebConfig, spawn_web};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Chef Eva web server.
#[derive(Parser)]
#[command(about = "HTTP API for the Chef Eva recipe assistant")]
struct Args {
    /// LLM model to use.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Port for the web server.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Initial reply language.
    #[arg(long, default_value = "English")]
    language: String,

    /// File holding the persisted message quota.
    #[arg(long, default_value = ".chefeva/quota.json")]
    quota_file: PathBuf,

    /// Front-end build to serve alongside the API.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let api_key = std::env::var(API_KEY_ENV)
        .map_err(|_| format!("Set {API_KEY_ENV} env var to your OpenRouter API key"))?;
    let client = OpenRouterClient::new(api_key)?;
    let backend = Arc::new(OpenRouterBackend::new(client).with_model(&args.model));

    let store: Arc<dyn QuotaStore> = Arc::new(FileQuotaStore::new(&args.quota_file));
    let session = ChatSession::open(ChatConfig::default().with_language(&args.language), store);

    let config = WebConfig {
        bind_addr: ([127, 0, 0, 1], args.port).into(),
        static_dir: args.static_dir,
    };
    let addr = spawn_web(AppState::with_handler(session, backend, LoggingHandler), config)
        .await
        .map_err(|e| format!("failed to bind port {}: {e}", args.port))?;
    println!("Chef Eva: http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to wait for Ctrl-C: {e}"))?;
    info!("Shutting down");
    Ok(())
}
