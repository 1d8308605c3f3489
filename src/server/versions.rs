//! Read-only version history endpoint served by the crawl worker

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use super::{serve_router, ApiError};
use crate::storage::{SqliteStorage, Storage, VersionRecord};

/// Rows returned when a single chunk is requested
pub const CHUNK_VERSION_LIMIT: u32 = 10;

/// Rows returned across all chunks of a page
pub const PAGE_VERSION_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct VersionsState {
    pub storage: SqliteStorage,
}

#[derive(Debug, Deserialize)]
struct VersionsQuery {
    url: Option<String>,
    chunk_id: Option<u32>,
}

#[derive(Debug, Serialize)]
struct VersionsResponse {
    versions: Vec<VersionRecord>,
}

/// Router for `GET /versions`, with permissive CORS so dashboards can read it
pub fn versions_router(state: VersionsState) -> Router {
    Router::new()
        .route("/versions", get(list_versions))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve_versions(
    storage: SqliteStorage,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> crate::Result<()> {
    serve_router(addr, versions_router(VersionsState { storage }), shutdown).await
}

async fn list_versions(
    State(state): State<VersionsState>,
    query: Result<Query<VersionsQuery>, QueryRejection>,
) -> Result<Json<VersionsResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let url = match query.url {
        Some(url) if !url.is_empty() => url,
        _ => return Err(ApiError::BadRequest("missing url parameter".to_string())),
    };

    let limit = match query.chunk_id {
        Some(_) => CHUNK_VERSION_LIMIT,
        None => PAGE_VERSION_LIMIT,
    };

    let versions = state.storage.list_versions(&url, query.chunk_id, limit)?;
    Ok(Json(VersionsResponse { versions }))
}
