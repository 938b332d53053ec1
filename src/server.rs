//! Webhook listener
//!
//! Thin HTTP shim over [`SignalRouter`]: one JSON POST endpoint for signals
//! and a liveness probe.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, warn};

use crate::config::types::ServerConfig;
use crate::gateway::{Outcome, Signal, SignalRouter};

/// Shared handler state
pub struct AppState {
    pub router: SignalRouter,
    /// Answer rejected signals with 200 so the sender does not retry them
    pub rejections_as_ok: bool,
}

impl AppState {
    pub fn new(router: SignalRouter, server: &ServerConfig) -> Self {
        Self {
            router,
            rejections_as_ok: server.rejections_as_ok,
        }
    }
}

/// Build the HTTP routes
pub fn app(state: Arc<AppState>, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(receive_signal))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn receive_signal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Signal>, JsonRejection>,
) -> impl IntoResponse {
    let signal = match payload {
        Ok(Json(signal)) => signal,
        Err(rejection) => {
            warn!("Malformed webhook payload: {}", rejection.body_text());
            let status = if state.rejections_as_ok {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            let body = json!({
                "status": "error",
                "outcome": Outcome::Rejected,
                "message": rejection.body_text(),
                "error_kind": "malformed_payload",
            });
            return (status, Json(body));
        }
    };

    info!(signal = %signal.signal, symbol = %signal.symbol, "webhook received");
    let result = state.router.handle(&signal).await;

    let status = match result.outcome {
        Outcome::Rejected if state.rejections_as_ok => StatusCode::OK,
        _ => StatusCode::from_u16(result.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    };
    let body = serde_json::to_value(&result).unwrap_or_else(|e| {
        json!({ "status": "error", "outcome": Outcome::Failed, "message": e.to_string() })
    });
    (status, Json(body))
}
