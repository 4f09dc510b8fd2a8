// WebSocket handler: pushes every completed device scan

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::DeviceScan;
use crate::render;
use crate::status_board::StatusBoard;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements ws_status connection count on drop (connect = +1, drop = -1).
struct WsStatusGuard(Arc<AtomicUsize>);

impl Drop for WsStatusGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
    }
}

pub(super) async fn ws_status(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let tx = state.status_tx.clone();
    let conn_count = state.ws_status_connections.clone();
    let board = state.board.clone();
    ws.on_upgrade(move |socket| async move {
        let mut rx = tx.subscribe();
        if let Err(e) = stream_status(socket, &mut rx, conn_count, board).await {
            tracing::info!("Status stream error: {}", e);
        }
    })
}

async fn send_text(socket: &mut WebSocket, json: String) -> bool {
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    matches!(r, Ok(Ok(())))
}

async fn stream_status(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<DeviceScan>,
    conn_count: Arc<AtomicUsize>,
    board: Arc<StatusBoard>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let _guard = WsStatusGuard(conn_count);
    tracing::info!("Client connected to status stream");

    let rows: Vec<_> = board.snapshot().await.iter().map(render::dashboard_row).collect();
    let welcome = serde_json::json!({ "type": "devices", "devices": rows });
    if !send_text(&mut socket, serde_json::to_string(&welcome)?).await {
        return Ok(());
    }

    // first ping one period after the welcome, not immediately
    let mut ping_interval = tokio::time::interval_at(
        tokio::time::Instant::now() + WS_PING_INTERVAL,
        WS_PING_INTERVAL,
    );
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(scan) => {
                        let msg = serde_json::json!({ "type": "scan", "scan": scan });
                        if !send_text(&mut socket, serde_json::to_string(&msg)?).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            "WebSocket /ws/status client lagged, skipped {} messages",
                            n
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    Ok(())
}
