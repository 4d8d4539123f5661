use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{Extensions, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::error::CloseReason;
use crate::ws::handle::ConnectionHandle;

/// Axum handler: upgrades HTTP to WebSocket at GET /ws.
///
/// Origins are not checked. A request that cannot be upgraded gets a 403
/// and never reaches the registry. Once shutdown starts every request gets a 503.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    extensions: Extensions,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if state.shutdown.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(error = %rejection, "websocket upgrade rejected");
            return (StatusCode::FORBIDDEN, "websocket upgrade failed").into_response();
        }
    };

    let remote = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    // counts as a live connection from the 101 response until its task ends
    let tracked = state.connections.token();

    ws.max_message_size(state.config.gateway.max_payload_bytes)
        .on_failed_upgrade(move |e| warn!(?remote, error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            run_connection(socket, state, remote).await;
            drop(tracked);
        })
}

/// Per-connection event loop. Lives from upgrade until the connection closes.
///
/// Every way out (client close, liveness timeout, transport error, slow
/// consumer, shutdown) ends the loop, so `on_close` runs exactly once.
async fn run_connection(socket: WebSocket, state: Arc<AppState>, remote: Option<SocketAddr>) {
    let hub = &state.hub;
    let (sink, mut stream) = socket.split();
    let (conn, rx) = ConnectionHandle::new(remote, state.config.outbound.queue_capacity);

    hub.on_open(&conn);
    let mut writer = tokio::spawn(writer_task(sink, rx, conn.clone()));

    let reason = loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(frame @ (Message::Text(_) | Message::Binary(_)))) => {
                    hub.on_message(&conn, frame);
                }
                Some(Ok(Message::Pong(_))) => hub.on_pong(&conn),
                // the socket answers pings itself
                Some(Ok(Message::Ping(_))) => hub.on_pong(&conn),
                Some(Ok(Message::Close(frame))) => {
                    debug!(conn_id = %conn.id(), ?frame, "client initiated close");
                    break CloseReason::ClientClosed;
                }
                Some(Err(e)) => break CloseReason::Transport(e.to_string()),
                None => break CloseReason::ClientClosed,
            },

            _ = tokio::time::sleep_until(conn.deadline()) => {
                break CloseReason::LivenessTimeout {
                    after_ms: hub.deadline_extension().as_millis() as u64,
                };
            }

            _ = conn.closing() => {
                break conn.close_reason().unwrap_or(CloseReason::Shutdown);
            }

            _ = state.shutdown.cancelled() => break CloseReason::Shutdown,
        }
    };

    hub.on_close(&conn, &reason);

    // let queued frames and the close frame go out, within the grace window
    if tokio::time::timeout(state.config.shutdown.grace(), &mut writer)
        .await
        .is_err()
    {
        debug!(conn_id = %conn.id(), "writer did not flush in time, aborting");
        writer.abort();
    }
}

/// Forward queued frames to the socket in FIFO order until the connection closes.
async fn writer_task(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Message>,
    conn: ConnectionHandle,
) {
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                if let Err(e) = sink.send(msg).await {
                    conn.close(CloseReason::Transport(e.to_string()));
                    return;
                }
            }
            _ = conn.closing() => break,
        }
    }

    while let Ok(msg) = rx.try_recv() {
        if sink.send(msg).await.is_err() {
            return;
        }
    }
    if let Some(frame) = conn.close_reason().and_then(|r| r.close_frame()) {
        let _ = sink.send(Message::Close(Some(frame))).await;
    }
    let _ = sink.close().await;
}
