//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::relay::RelayHub;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{decode_client_msg, ConnectionId, ServerMsg};

type WsSink = futures::stream::SplitSink<WebSocket, Message>;
type WsStream = futures::stream::SplitStream<WebSocket>;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection = state.relay.connect();
    let connection_id = connection.id;
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);

    run_session(
        connection_id,
        &state.relay,
        rate_limiter,
        ws_sink,
        ws_stream,
        connection.outbound,
    )
    .await;

    // Cleanup on disconnect
    state.relay.disconnect(connection_id);

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: ConnectionId,
    relay: &RelayHub,
    rate_limiter: ConnectionRateLimiter,
    mut ws_sink: WsSink,
    mut ws_stream: WsStream,
    mut outbound: mpsc::Receiver<ServerMsg>,
) {
    // Spawn writer task: relay queue -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        debug!(connection_id = %connection_id, "Outbound queue closed");
    });

    // Reader loop: WebSocket -> relay
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(connection_id = %connection_id, "Rate limited inbound message");
                    continue;
                }

                match decode_client_msg(&text) {
                    Ok(client_msg) => {
                        debug!(
                            connection_id = %connection_id,
                            event = client_msg.event_name(),
                            "Inbound message"
                        );
                        relay.handle(connection_id, client_msg);
                    }
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Dropping client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection_id = %connection_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
