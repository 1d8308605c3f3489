//! HTTP boundaries
//!
//! - `frontier`: the queue's Put/GetNext/Ack calls and its `/stats` and `/seed` endpoints
//! - `versions`: the crawl worker's read-only version history endpoint

mod frontier;
mod versions;

pub use frontier::{rest_router, rpc_router, serve_frontier, FrontierState};
pub use versions::{serve_versions, versions_router, VersionsState};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use crate::storage::StorageError;

/// Error returned by HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body or query (4xx, nothing was applied)
    BadRequest(String),
    /// Storage or upstream failure (5xx with the underlying error text)
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "storage failure while serving request");
        Self::Internal(err.to_string())
    }
}

/// Binds `addr` and serves `router` until `shutdown` is cancelled
///
/// Binding failures are returned immediately so callers can abort startup.
pub async fn serve_router(
    addr: SocketAddr,
    router: Router,
    shutdown: CancellationToken,
) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_listener(listener, router, shutdown).await
}

/// Serves `router` on an already bound listener until `shutdown` is cancelled
pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> crate::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
