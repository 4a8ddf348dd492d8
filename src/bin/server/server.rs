//! HTTP server for emotion classification.

use crate::config::ServerConfig;
use crate::predict::predict_handler;
use crate::upload::UploadStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use emonet::core::config::OrtSessionConfig;
use emonet::predictors::EmotionClassifier;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Maximum accepted request body size (16 MiB), enforced ahead of the
/// prediction pipeline.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub classifier: EmotionClassifier,
    pub uploads: UploadStore,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Builds the application router over the given state.
///
/// Kept separate from [`run_server`] so tests can drive the exact
/// production routing with a stub classifier.
pub fn app(state: Arc<AppState>, web_root: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .route_service("/", ServeFile::new(web_root.join("index.html")))
        .route_service("/app.html", ServeFile::new(web_root.join("app.html")))
        .fallback_service(ServeDir::new(web_root))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // The model loads exactly once, before the listener binds. A failure
    // here propagates out of main with a non-zero exit; no traffic is ever
    // accepted against a half-initialized classifier.
    info!(
        "Loading emotion model from {}...",
        config.model.model_path.display()
    );
    let mut ort_config = OrtSessionConfig::new();
    if let Some(intra) = config.model.intra_threads {
        ort_config = ort_config.with_intra_threads(intra);
    }
    let classifier = EmotionClassifier::builder()
        .input_name(&config.model.input_name)
        .session_pool_size(config.model.session_pool_size)
        .with_ort_config(ort_config)
        .build(&config.model.model_path)?;
    info!("Emotion model loaded successfully");

    let uploads = UploadStore::new(&config.upload_dir)?;
    info!(
        "Upload scratch directory: {}",
        config.upload_dir.display()
    );

    let state = Arc::new(AppState {
        classifier,
        uploads,
    });
    let app = app(state, &config.web_root);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    info!("Server listening on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /          - Intro page");
    info!("  GET  /app.html  - Upload page");
    info!("  GET  /health    - Health check");
    info!("  POST /predict   - Emotion prediction");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
