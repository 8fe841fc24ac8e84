use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::state::AppState;

use super::meeting::build_envelope;

/// spec.md §4.7 streaming status: on connect, send the current snapshot,
/// then forward every subsequent `job_updates` broadcast for this job until
/// the client disconnects. Client frames are read only to detect close.
pub async fn stream_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, request_id, socket))
}

async fn handle_socket(state: AppState, request_id: String, mut socket: WebSocket) {
    let mut registration = state.bus.register(&request_id).await;

    match state.store.get_job(&request_id).await {
        Ok(job) => match build_envelope(&state, &job).await {
            Ok(envelope) => {
                let Ok(text) = serde_json::to_string(&envelope) else {
                    return;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(request_id, error = %e, "ws_initial_snapshot_failed");
            }
        },
        Err(e) => {
            tracing::warn!(request_id, error = %e, "ws_job_not_found");
            return;
        }
    }

    loop {
        tokio::select! {
            update = registration.receiver.recv() => {
                match update {
                    Some(payload) => {
                        let Ok(text) = serde_json::to_string(&payload) else { continue };
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                }
            }
        }
    }
}
