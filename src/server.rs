use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use thiserror::Error;
use tokio::{net::TcpListener, signal, task::spawn_blocking};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    backend::Backend,
    config::Config,
    services::patterns::{PatternUrlError, pattern_download_url},
};

pub struct ServerState<B> {
    pub backend: B,
    pub signed_url_ttl: u64,
}

#[derive(Serialize)]
pub struct PatternUrlResponse {
    pub url: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Project not found.")]
    InvalidId,

    #[error(transparent)]
    PatternUrl(#[from] PatternUrlError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidId => StatusCode::NOT_FOUND,
            AppError::PatternUrl(PatternUrlError::ProjectNotFound(_))
            | AppError::PatternUrl(PatternUrlError::NoPattern(_)) => StatusCode::NOT_FOUND,
            AppError::PatternUrl(PatternUrlError::SigningFailed(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = match &self {
            AppError::Internal(_) => String::from("Unexpected server error."),
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

pub fn router<B>(state: Arc<ServerState<B>>) -> Router
where
    B: Backend + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/projects/:id/pattern-url", get(pattern_url_handler::<B>))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn pattern_url_handler<B>(
    State(state): State<Arc<ServerState<B>>>,
    Path(id): Path<String>,
) -> Result<Json<PatternUrlResponse>, AppError>
where
    B: Backend + Send + Sync + 'static,
{
    let id = Uuid::parse_str(&id).map_err(|_| AppError::InvalidId)?;

    // Backend calls block, keep them off the async workers
    let url = spawn_blocking(move || {
        pattern_download_url(&state.backend, id, state.signed_url_ttl)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Json(PatternUrlResponse { url }))
}

pub async fn start_server<B>(backend: B, config: &Config) -> std::io::Result<()>
where
    B: Backend + Send + Sync + 'static,
{
    let state = Arc::new(ServerState {
        backend,
        signed_url_ttl: config.signed_url_ttl,
    });

    let app = router(state);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
