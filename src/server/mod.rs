//! Prediction server
//!
//! Minimal HTTP server around one resolved model. The model is resolved once
//! at startup (falling back to a synthetic one if needed) and never reloaded;
//! request handling is plain synchronous work per request.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use crate::resolve::ModelResolver;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            model_dir: std::env::var("MODELS_DIR")
                .unwrap_or_else(|_| "models".to_string())
                .into(),
        }
    }
}

/// Resolve a model and serve it until ctrl-c.
pub async fn run_server(config: ServeConfig) -> anyhow::Result<()> {
    let resolved = ModelResolver::new(&config.model_dir).resolve();
    info!(
        model = %resolved.artifact.family,
        source = %resolved.source.status(),
        "Serving model"
    );

    let state = Arc::new(AppState::new(config.clone(), resolved));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Prediction server listening");
    info!(url = %format!("http://{}/health", addr), "Health endpoint available");

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Shutdown signal received, stopping server");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
