pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod jwt;
pub mod store;

use api::create_api_router;
use axum::{Json, Router, routing::get};
use jwt::TokenSigner;
use std::net::SocketAddr;
use std::sync::Arc;
use store::CredentialStore;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens (must differ from the access secret)
    pub refresh_secret: Vec<u8>,
    /// Credential store backing register/login
    pub store: CredentialStore,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let signer = Arc::new(TokenSigner::new(
        &config.access_secret,
        &config.refresh_secret,
    ));

    let api_router = create_api_router(config.store.clone(), signer);

    Router::new()
        .route("/", get(health))
        .nest("/api", api_router)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "message": "Session gate is running.",
    }))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
