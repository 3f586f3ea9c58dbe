//! WebSocket upgrade handler
//!
//! Overlay renderers and the chat bridge share this endpoint. Every client
//! receives the session's outbound stream; text frames sent by a client are
//! parsed as chat events and queued for the next tick.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::SessionHandle;
use crate::ws::protocol::{ChatEvent, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let output_rx = state.session.subscribe();

    run_connection(conn_id, ws_sink, ws_stream, state.session.clone(), output_rx).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Run the connection with read/write split
async fn run_connection(
    conn_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    session: SessionHandle,
    mut output_rx: broadcast::Receiver<ServerMsg>,
) {
    // Spawn writer task: session output -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match output_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        conn_id = %conn_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(conn_id = %conn_id, "Session output closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ChatEvent>(&text) {
                Ok(event) => {
                    debug!(
                        conn_id = %conn_id,
                        user_id = %event.user_id,
                        command = %event.command,
                        "Chat event received"
                    );
                    if session.submit(event).await.is_err() {
                        debug!(conn_id = %conn_id, "Session input closed");
                        break;
                    }
                }
                Err(e) => {
                    warn!(conn_id = %conn_id, error = %e, "Failed to parse chat event");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
