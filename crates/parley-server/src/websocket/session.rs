//! WebSocket session lifecycle — handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use metrics::{counter, histogram};
use parley_core::InboundMessage;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::events::{ClientEvent, ServerEvent};
use crate::state::AppState;

use super::connection::ClientConnection;

/// Depth of the per-connection outbound queue.
const SEND_QUEUE_DEPTH: usize = 256;

/// Run a WebSocket session for a connected client.
///
/// 1. Sends a `connection.established` event with the welcome text
/// 2. Dispatches incoming text frames through the pipeline
/// 3. Forwards outbound events via the send channel
/// 4. Sends periodic Ping frames and disconnects unresponsive clients
/// 5. Cleans up on disconnect
#[instrument(skip_all, fields(connection_id = %connection_id, conversation = %conversation_key))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: String,
    conversation_key: String,
    state: Arc<AppState>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<String>(SEND_QUEUE_DEPTH);
    let connection = Arc::new(ClientConnection::new(
        connection_id.clone(),
        conversation_key,
        send_tx,
    ));

    let connection_start = std::time::Instant::now();
    info!("client connected");
    counter!("ws_connections_total").increment(1);

    state.registry.add(Arc::clone(&connection)).await;

    let welcome = ServerEvent::Welcome {
        message: state.settings.templates.welcome.clone(),
        timestamp: Utc::now().timestamp(),
    };
    let _ = ws_tx.send(Message::Text(welcome.to_json().into())).await;

    // Outbound forwarder with periodic Ping frames. A client that misses
    // a full ping cycle is disconnected.
    let ping_interval = Duration::from_secs(state.settings.server.heartbeat_interval_secs);
    let outbound_conn = Arc::clone(&connection);
    let outbound = tokio::spawn(async move {
        let mut ping_timer = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = ping_timer.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_timer.tick() => {
                    if !outbound_conn.check_alive() {
                        warn!("client missed a ping cycle, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_conn.shutdown.cancelled() => {
                    // Drain whatever is already queued (the timeout
                    // notice), then close.
                    while let Ok(text) = send_rx.try_recv() {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Process incoming frames until close, error, or forced shutdown.
    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            () = connection.shutdown.cancelled() => break,
        };
        let Some(Ok(msg)) = msg else { break };

        match msg {
            Message::Text(ref text) => {
                connection.mark_alive();
                handle_text(&state, &connection, text).await;
            }
            Message::Ping(_) | Message::Pong(_) => connection.mark_alive(),
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Binary(_) => {
                debug!("ignoring binary frame");
            }
        }
    }

    info!("client disconnected");
    counter!("ws_disconnections_total").increment(1);
    histogram!("ws_connection_duration_seconds").record(connection_start.elapsed().as_secs_f64());
    outbound.abort();
    state.registry.remove(&connection_id).await;
}

/// Dispatch one inbound text frame.
///
/// Malformed payloads and pipeline-level problems are answered with a
/// `server.error`; the connection is never closed for them.
async fn handle_text(state: &AppState, conn: &ClientConnection, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            debug!(%err, "unparseable client payload");
            let _ = conn.send(
                ServerEvent::Error {
                    message: "could not understand that message".to_string(),
                }
                .to_json(),
            );
            return;
        }
    };

    match event {
        ClientEvent::Ping { timestamp } => {
            conn.touch();
            let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp());
            let _ = conn.send(ServerEvent::Pong { timestamp }.to_json());
        }
        ClientEvent::Message { text } => {
            conn.touch();
            if text.trim().is_empty() {
                let _ = conn.send(
                    ServerEvent::Error {
                        message: "message text is empty".to_string(),
                    }
                    .to_json(),
                );
                return;
            }
            let inbound = InboundMessage::new(text, "websocket", conn.conversation_key.clone());

            match state.dedup.is_duplicate(&inbound.text).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(err) => {
                    warn!(%err, "dedup store unavailable, treating message as fresh");
                }
            }

            counter!("ws_messages_total").increment(1);
            let room = inbound.conversation_key.as_str();
            let _ = state
                .registry
                .broadcast(room, &ServerEvent::Typing { typing: true })
                .await;
            let result = state.orchestrator.process(&inbound.text).await;
            let _ = state
                .registry
                .broadcast(room, &ServerEvent::from_result(result))
                .await;
            // The pipeline never errors, so the typing indicator always
            // comes back down.
            let _ = state
                .registry
                .broadcast(room, &ServerEvent::Typing { typing: false })
                .await;
        }
    }
}
