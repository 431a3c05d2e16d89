//! HTTP API: router assembly, shared state, and the service-identity
//! endpoints.

pub mod cards;
pub mod data;
pub mod upload;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use cardforge_store::Database;

use crate::config::AppConfig;
use crate::file_store::FileStore;
use crate::schemas::{HealthResponse, RootResponse};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub files: Arc<FileStore>,
    pub config: Arc<AppConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/cards/generate", post(cards::generate))
        .route("/cards/save", post(cards::save))
        .route("/cards/list", get(cards::list))
        .route("/cards/{card_sn}", delete(cards::remove))
        .route(
            "/cards/{card_sn}/generated-image",
            post(cards::upload_generated_image).delete(cards::delete_latest_generated_image),
        )
        .route(
            "/cards/{card_sn}/generated-images",
            get(cards::list_generated_images),
        )
        .route("/upload/single", post(upload::single))
        .route("/upload/multiple", post(upload::multiple))
        .route(
            "/upload/file/{*path}",
            get(upload::fetch).delete(upload::remove),
        );

    // Leave headroom above the per-file limit for multipart framing.
    let body_limit = state.config.max_upload_size.saturating_add(1024 * 1024);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .route("/data/{*path}", get(data::serve_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: state.config.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
