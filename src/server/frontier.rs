//! Frontier queue endpoints
//!
//! The RPC router carries the queue contract (Put, streaming GetNext, Ack);
//! the REST router carries the operator-facing `/stats` and `/seed`.

use axum::body::{Body, Bytes};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use super::{serve_router, ApiError};
use crate::frontier::{
    AckRequest, AckResponse, GetNextRequest, NewQueueItem, PutRequest, PutResponse, QueueStats,
    SeedRequest,
};
use crate::storage::{QueueStorage, SqliteQueue};

/// Shared state for the frontier routers
#[derive(Clone)]
pub struct FrontierState {
    pub queue: SqliteQueue,
}

/// Router for Put, GetNext and Ack
pub fn rpc_router(state: FrontierState) -> Router {
    Router::new()
        .route("/rpc/put", post(put))
        .route("/rpc/get-next", post(get_next))
        .route("/rpc/ack", post(ack))
        .with_state(state)
}

/// Router for `/stats` and `/seed`
pub fn rest_router(state: FrontierState) -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/seed", post(seed))
        .with_state(state)
}

/// Runs both frontier listeners until `shutdown` is cancelled or either fails
pub async fn serve_frontier(
    queue: SqliteQueue,
    rpc_addr: SocketAddr,
    rest_addr: SocketAddr,
    shutdown: CancellationToken,
) -> crate::Result<()> {
    let state = FrontierState { queue };

    tokio::try_join!(
        serve_router(rpc_addr, rpc_router(state.clone()), shutdown.clone()),
        serve_router(rest_addr, rest_router(state), shutdown),
    )?;

    Ok(())
}

fn bad_request(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

async fn put(
    State(state): State<FrontierState>,
    payload: Result<Json<PutRequest>, JsonRejection>,
) -> Result<Json<PutResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_request)?;

    let accepted = state.queue.put(&request.items)?;
    tracing::debug!(submitted = request.items.len(), accepted, "put");

    Ok(Json(PutResponse { accepted }))
}

/// Streams the selected items as newline-delimited JSON
///
/// The selection is a snapshot taken when the call arrives; nothing is
/// marked in flight.
async fn get_next(
    State(state): State<FrontierState>,
    payload: Result<Json<GetNextRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(bad_request)?;

    let items = state.queue.get_next(&request.scope, request.limit)?;
    tracing::debug!(scope = %request.scope, limit = request.limit, returned = items.len(), "get_next");

    let lines = futures_util::stream::iter(items.into_iter().map(|item| {
        serde_json::to_vec(&item).map(|mut line| {
            line.push(b'\n');
            Bytes::from(line)
        })
    }));

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}

async fn ack(
    State(state): State<FrontierState>,
    payload: Result<Json<AckRequest>, JsonRejection>,
) -> Result<Json<AckResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_request)?;

    let acked = state.queue.ack(&request.ids)?;
    tracing::debug!(submitted = request.ids.len(), acked, "ack");

    Ok(Json(AckResponse { acked }))
}

async fn stats(State(state): State<FrontierState>) -> Result<Json<QueueStats>, ApiError> {
    let queued = state.queue.count()?;
    Ok(Json(QueueStats { queued }))
}

async fn seed(
    State(state): State<FrontierState>,
    payload: Result<Json<SeedRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(bad_request)?;

    let items: Vec<NewQueueItem> = request
        .urls
        .iter()
        .map(|url| NewQueueItem::new(url.as_str(), request.scope.as_str()))
        .collect();
    let accepted = state.queue.put(&items)?;
    tracing::info!(scope = %request.scope, urls = items.len(), accepted, "seeded frontier");

    Ok(StatusCode::NO_CONTENT)
}
