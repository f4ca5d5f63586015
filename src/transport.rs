//! HTTP transport for the dataflow runtime.
//!
//! Endpoints:
//! - GET  /health  - Liveness check
//! - POST /v1/map  - Handle one message: `{keys, value}` in, where `value`
//!   is base64; `{messages: [{keys, value, tags}]}` out

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::EventHandler;
use crate::routing::{process, RoutedMessage};

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MapRequest {
    #[serde(default)]
    pub keys: Vec<String>,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MapResponse {
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireMessage {
    pub keys: Vec<String>,
    pub value: String,
    pub tags: Vec<String>,
}

impl From<RoutedMessage> for WireMessage {
    fn from(msg: RoutedMessage) -> Self {
        Self {
            keys: msg.keys,
            value: STANDARD.encode(msg.value),
            tags: msg.tags,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    handler: Arc<dyn EventHandler>,
}

pub fn router(handler: Arc<dyn EventHandler>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/map", post(map))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { handler })
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "handler": state.handler.name() }))
}

async fn map(State(state): State<AppState>, Json(request): Json<MapRequest>) -> Response {
    let value = match STANDARD.decode(request.value.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Message value is not valid base64");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("value is not valid base64: {e}") })),
            )
                .into_response();
        }
    };
    let routed = process(state.handler.as_ref(), &request.keys, &value).await;
    Json(MapResponse {
        messages: vec![routed.into()],
    })
    .into_response()
}
