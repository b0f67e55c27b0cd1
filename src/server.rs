use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{debug, error, info};

use crate::detection::{CoinPipeline, DetectionModel, decode_image};
use crate::models::CoinReport;

/// Largest accepted upload. Phone photos of coins are routinely a few MB.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state. Everything in here is read-only.
pub struct AppState {
    pub pipeline: CoinPipeline,
    pub model: Arc<dyn DetectionModel>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/detect-coins", post(detect_coins))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn home() -> &'static str {
    "Welcome to the Coin Detection API!"
}

/// POST /detect-coins — multipart/form-data with an `image` field. Only the
/// first `image` part is read.
async fn detect_coins(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CoinReport>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "request is not multipart");
        no_image()
    })?;

    let mut image_data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("multipart error: {e}")))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("image read error: {e}")))?;
            image_data = Some(bytes);
            break;
        }
    }

    let data = image_data.ok_or_else(no_image)?;
    let image = decode_image(&data).map_err(|e| {
        debug!(error = %e, bytes = data.len(), "image decode failed");
        bad_request("Invalid image.".into())
    })?;

    let result = tokio::task::spawn_blocking(move || state.pipeline.run(&image, state.model.as_ref()))
        .await
        .map_err(|e| internal_error(format!("pipeline task failed: {e}")))?
        .map_err(|e| internal_error(e.to_string()))?;

    Ok(Json(result.to_report()))
}

fn no_image() -> ApiError {
    bad_request("No image uploaded.".into())
}

fn bad_request(msg: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg }))
}

fn internal_error(msg: String) -> ApiError {
    error!(error = %msg, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: msg }),
    )
}

/// Serve the API until Ctrl+C or SIGTERM.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state).layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
