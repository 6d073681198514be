//! HTTP surface of the share server.
//!
//! - `POST /api/parameters` with `{"code": "..."}` answers `{"id": "..."}`.
//! - `GET /api/parameters/:id` answers `{"code": "..."}`.
//!
//! Errors answer with an [`ErrorBody`]; an oversized payload also carries
//! the ceiling in `limit`.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use playground_share::{
    ErrorBody, ShareError, ShareRecord, ShareResponse, ShareService, SHARE_ROUTE,
};
use tracing::{info, warn};

/// Extra room over the share ceiling before the transport refuses a body.
///
/// Escaped JSON on the wire can be larger than the canonical form the
/// ceiling is measured on.
const BODY_SLACK_BYTES: usize = 64 * 1024;

struct AppState {
    service: ShareService,
}

/// Build the share routes around `service`.
pub fn router(service: ShareService) -> Router {
    let body_limit = service
        .max_bytes()
        .saturating_mul(2)
        .saturating_add(BODY_SLACK_BYTES);
    let state = Arc::new(AppState { service });

    Router::new()
        .route(SHARE_ROUTE, post(put_share))
        .route(&format!("{}/:id", SHARE_ROUTE), get(get_share))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Serving share API on http://{}{}", addr, SHARE_ROUTE);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn put_share(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let record: ShareRecord = match serde_json::from_slice(&body) {
        Ok(record) => record,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string(), None),
    };

    match state.service.put(&record).await {
        Ok(id) => (StatusCode::OK, Json(ShareResponse { id })).into_response(),
        Err(e) => share_error_response(&e, state.service.max_bytes()),
    }
}

async fn get_share(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.service.get_str(&id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => share_error_response(&e, state.service.max_bytes()),
    }
}

async fn health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "version": playground_core::VERSION,
        })),
    )
        .into_response()
}

fn share_error_response(err: &ShareError, max_bytes: usize) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(error = %err, "share request failed");
    }

    let limit = matches!(err, ShareError::PayloadTooLarge { .. }).then_some(max_bytes);
    error_response(status, err.to_string(), limit)
}

fn error_response(status: StatusCode, error: String, limit: Option<usize>) -> Response {
    (status, Json(ErrorBody { error, limit })).into_response()
}
