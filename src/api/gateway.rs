use crate::api::AppState;
use crate::services::gateway::{ClientFrame, Room};
use axum::{
    extract::{
        Query, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: String,
}

/// `GET /ws?token=...`: authenticates the handshake, then upgrades. The
/// connection is auto-joined to the user's own room so direct events reach
/// it without an explicit subscribe.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Response {
    match state.auth_service.verify_token(&params.token) {
        Ok(claims) => ws.on_upgrade(move |socket| handle_socket(socket, state, claims.sub)),
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket handshake failed: invalid token");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let connection_id = Uuid::new_v4();
    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::channel(state.config.websocket.outbound_buffer_size);
    let mut shutdown_rx = state.shutdown_rx.clone();

    state.rooms.join(Room::User(user_id), connection_id, outbound_tx.clone());
    tracing::info!(%user_id, %connection_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_client_frame(&state, user_id, connection_id, text.as_str(), &outbound_tx).await;
                    }
                    Some(Ok(WsMessage::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sink.send(WsMessage::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Could not serialize gateway event"),
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break;
                }
            }
        }
    }

    state.rooms.disconnect(connection_id);
    tracing::info!(%user_id, %connection_id, "WebSocket disconnected");
}

/// Applies a join/leave frame. Joins are authorized against conversation
/// membership; a denied or malformed frame is logged and dropped, the
/// connection stays up.
async fn handle_client_frame(
    state: &AppState,
    user_id: Uuid,
    connection_id: Uuid,
    raw: &str,
    outbound_tx: &tokio::sync::mpsc::Sender<crate::services::gateway::GatewayEvent>,
) {
    let frame = match serde_json::from_str::<ClientFrame>(raw) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, %connection_id, "Ignoring malformed client frame");
            return;
        }
    };

    match frame {
        ClientFrame::JoinConversation { conversation_id } => {
            match state.conversation_service.is_participant(conversation_id, user_id).await {
                Ok(true) => {
                    state.rooms.join(Room::Conversation(conversation_id), connection_id, outbound_tx.clone());
                }
                Ok(false) => {
                    tracing::warn!(%user_id, %conversation_id, "Join denied: not a participant");
                }
                Err(e) => {
                    tracing::warn!(error = %e, %conversation_id, "Join membership check failed");
                }
            }
        }
        ClientFrame::LeaveConversation { conversation_id } => {
            state.rooms.leave(Room::Conversation(conversation_id), connection_id);
        }
    }
}
