//! # cardforge-server
//!
//! Backend API server for the trading-card generator:
//! - **REST API** (axum) for card generation, persistence, and listing
//! - **Prompt rendering** for downstream AI image generation
//! - **File store** for uploaded and generated images, served under `/data`
//! - **SQLite persistence** via the `cardforge-store` crate

mod api;
mod config;
mod error;
mod file_store;
mod prompt;
mod schemas;
mod service;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cardforge_store::Database;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::file_store::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Load configuration
    // -----------------------------------------------------------------------
    let config = AppConfig::from_env();

    // -----------------------------------------------------------------------
    // 2. Initialize tracing (RUST_LOG overrides the DEBUG-derived default)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    info!("Starting card generator server v{}", env!("CARGO_PKG_VERSION"));
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Database (runs migrations, creates directory if missing)
    let db = Database::open(&config.database_dir, &config.database_file)?;

    // File store (creates the upload root if missing)
    let files = FileStore::new(
        config.upload_dir.clone(),
        config.max_upload_size,
        config.allowed_extensions.clone(),
    )
    .await?;

    let addr = config.socket_addr();
    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        files: Arc::new(files),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
