use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::domain::conversation::{ConversationHandle, ConversationSummary};
use crate::domain::message::MessageView;
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message_text: String,
}

/// `POST /conversations/create`: returns the existing conversation for the
/// pair, or creates one. 201 only when a new conversation was created. The
/// caller must be one of the two users.
pub async fn create_or_get(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationHandle>)> {
    let other = if auth.user_id == req.user1_id {
        req.user2_id
    } else if auth.user_id == req.user2_id {
        req.user1_id
    } else {
        return Err(AppError::Forbidden("Cannot open a conversation on behalf of other users".into()));
    };
    let handle = state.conversation_service.create_or_get(auth.user_id, other).await?;
    let status = if handle.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(handle)))
}

/// `GET /conversations/user/{userId}`: that user's conversation list, most
/// recent first. Callers may only list their own conversations.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<ConversationSummary>>> {
    if auth.user_id != user_id {
        return Err(AppError::Forbidden("Cannot list another user's conversations".into()));
    }
    let summaries = state.conversation_service.list_conversations(user_id).await?;
    Ok(Json(summaries))
}

/// `GET /conversations/{id}/messages`: one page of messages, oldest first
/// within the page.
pub async fn get_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageView>>> {
    let messages = state
        .conversation_service
        .get_messages(auth.user_id, conversation_id, query.page, query.page_size)
        .await?;
    Ok(Json(messages))
}

/// `POST /conversations/{id}/messages`: stores a message and fans it out.
pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>)> {
    let view = state.conversation_service.send_message(auth.user_id, conversation_id, &req.message_text).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `PUT /conversations/{id}/messages/{messageId}/read`: read acknowledgment
/// by the recipient.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((conversation_id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>> {
    state.conversation_service.mark_read(auth.user_id, conversation_id, message_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// `DELETE /conversations/{id}/messages/{messageId}`: sender-only delete.
pub async fn delete_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((conversation_id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    state.conversation_service.delete_message(auth.user_id, conversation_id, message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /conversations/{id}`: removes the conversation and everything in
/// it.
pub async fn delete_conversation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.conversation_service.delete_conversation(auth.user_id, conversation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
