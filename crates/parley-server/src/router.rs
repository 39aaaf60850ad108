//! Axum router: the WebSocket upgrade and the health endpoint.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::health::{self, HealthResponse};
use crate::state::AppState;
use crate::websocket::session::run_ws_session;

/// Query parameters accepted on the `/ws` upgrade.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Conversation key to join. A fresh conversation is created when
    /// absent.
    #[serde(default)]
    pub conversation: Option<String>,
}

/// Build the router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connections = state.registry.connection_count().await;
    Json(health::health_check(state.started_at, connections))
}

/// GET /ws — upgrade to a chat session.
async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let conversation = params
        .conversation
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
    let connection_id = uuid::Uuid::now_v7().to_string();
    info!(%connection_id, %conversation, "websocket upgrade");
    ws.on_upgrade(move |socket| run_ws_session(socket, connection_id, conversation, state))
}
