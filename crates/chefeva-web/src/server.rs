//! Axum server setup and router construction.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::api::{self, AppState};

/// Build the full axum router: the REST API under `/api/*`, plus the
/// front-end build as a fallback when `static_dir` is set.
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    // CORS layer for development (front end served from another port).
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/api/session", get(api::get_session))
        .route("/api/languages", get(api::get_languages))
        .route("/api/chat", post(api::post_chat))
        .route("/api/reset", post(api::post_reset))
        .route("/api/language", post(api::post_language))
        .route("/api/recipe", post(api::post_recipe))
        .route("/api/menu", post(api::post_menu))
        .with_state(state)
        .layer(cors);

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
}

/// Bind `bind_addr`, serve `router` on a background task, and return the
/// bound address (useful with port 0).
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;
    info!("Listening on {addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Server stopped: {e}");
        }
    });

    Ok(addr)
}
