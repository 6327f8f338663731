//! HTTP API for the Chef Eva recipe assistant.
//!
//! `chefeva-web` wraps one [`ChatSession`](chefeva::chat::ChatSession) and a
//! [`RecipeGenerator`](chefeva::recipe::RecipeGenerator) in an axum server so
//! a browser front end can chat, switch language, and request recipes and
//! menus.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use chefeva::prelude::*;
//! use chefeva_web::{AppState, WebConfig, spawn_web};
//!
//! let store: Arc<dyn QuotaStore> = Arc::new(FileQuotaStore::new("quota.json"));
//! let session = ChatSession::open(ChatConfig::default(), store);
//! let backend = Arc::new(OpenRouterBackend::new(OpenRouterClient::new(key)?));
//!
//! let addr = spawn_web(AppState::new(session, backend), WebConfig::default()).await?;
//! println!("Chef Eva: http://{addr}");
//! ```
//!
//! # Endpoints
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /api/session` | Conversation, language and quota, never blocked by a send |
//! | `GET /api/languages` | Built-in languages |
//! | `POST /api/chat` | Send a message (409 while another is in flight) |
//! | `POST /api/reset` | Fresh conversation, quota untouched (409 during a send) |
//! | `POST /api/language` | Switch reply language (409 during a send) |
//! | `POST /api/recipe` | Generate a recipe |
//! | `POST /api/menu` | Plan a menu |

mod api;
mod server;
mod snapshot;

pub use api::{AppState, ChatBody, ChatReply, ErrorBody, LanguageBody};
pub use server::{build_router, start_server};
pub use snapshot::SnapshotPublisher;

use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Directory with the front-end build. `None` serves the API only.
    pub static_dir: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            static_dir: None,
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(state: AppState, config: WebConfig) -> std::io::Result<SocketAddr> {
    let router = build_router(state, config.static_dir);
    start_server(router, config.bind_addr).await
}
