use crate::domain::conversation::{ConversationHandle, ConversationSummary, participant_key};
use crate::domain::message::{AttachmentRef, MessageStatus, MessageView};
use crate::error::{AppError, Result};
use crate::services::gateway::{GatewayEvent, Room, RoomRegistry};
use crate::services::push::{PushNotification, PushProvider};
use crate::storage::conversation_repo::ConversationRepository;
use crate::storage::user_repo::UserRepository;
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

const DEFAULT_MESSAGE_PAGE_SIZE: u32 = 50;
const MAX_MESSAGE_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug)]
struct Metrics {
    messages_sent_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("faena-server");
        Self {
            messages_sent_total: meter
                .u64_counter("faena_messages_sent_total")
                .with_description("Total messages successfully stored")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConversationService {
    repo: ConversationRepository,
    user_repo: UserRepository,
    rooms: RoomRegistry,
    push: Arc<dyn PushProvider>,
    metrics: Metrics,
}

impl ConversationService {
    pub fn new(
        repo: ConversationRepository,
        user_repo: UserRepository,
        rooms: RoomRegistry,
        push: Arc<dyn PushProvider>,
    ) -> Self {
        Self { repo, user_repo, rooms, push, metrics: Metrics::new() }
    }

    /// Finds the conversation between two users, creating it if absent.
    /// The unique participant key makes concurrent creates converge on a
    /// single row; the loser of the race re-reads the winner's conversation.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn create_or_get(&self, user_id: Uuid, other_user_id: Uuid) -> Result<ConversationHandle> {
        if user_id == other_user_id {
            return Err(AppError::BadRequest("Cannot start a conversation with yourself".into()));
        }
        if self.user_repo.identity(other_user_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        if let Some(id) = self.repo.find_for_pair(user_id, other_user_id).await? {
            return Ok(ConversationHandle { conversation_id: id, created: false });
        }

        let key = participant_key(user_id, other_user_id);
        if let Some(id) = self.repo.create_with_participants(user_id, other_user_id, &key).await? {
            return Ok(ConversationHandle { conversation_id: id, created: true });
        }

        // Lost the insert race; the other request's row must now exist.
        let id = self.repo.find_for_pair(user_id, other_user_id).await?.ok_or(AppError::Internal)?;
        Ok(ConversationHandle { conversation_id: id, created: false })
    }

    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>> {
        let records = self.repo.summaries_for_user(user_id).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Returns one page of a conversation's messages, oldest first within
    /// the page. Only participants may read.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn get_messages(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Vec<MessageView>> {
        self.require_participant(conversation_id, user_id).await?;

        let page = page.unwrap_or(1).max(1);
        let page_size = page_size.unwrap_or(DEFAULT_MESSAGE_PAGE_SIZE).clamp(1, MAX_MESSAGE_PAGE_SIZE);
        let offset = i64::from(page - 1) * i64::from(page_size);

        let mut rows = self.repo.messages_page(conversation_id, i64::from(page_size), offset).await?;
        rows.reverse();
        Ok(rows.into_iter().map(|r| r.into_view()).collect())
    }

    /// Stores a message and notifies the other side. The message is
    /// delivered the moment it is stored; realtime fan-out and push are
    /// post-commit side effects that never fail the request.
    #[tracing::instrument(skip(self, text), err(level = "warn"))]
    pub async fn send_message(&self, user_id: Uuid, conversation_id: Uuid, text: &str) -> Result<MessageView> {
        self.require_participant(conversation_id, user_id).await?;
        if text.trim().is_empty() {
            return Err(AppError::BadRequest("Message text must not be empty".into()));
        }

        let sender = self.user_repo.identity(user_id).await?.ok_or(AppError::AuthError)?;
        let attachment = AttachmentRef::parse_token(text);

        let record = self.repo.create_message(conversation_id, user_id, text, attachment.as_ref()).await?;
        self.metrics.messages_sent_total.add(1, &[]);

        let view = record.with_sender(sender.email, sender.role).into_view();

        self.rooms.broadcast(
            Room::Conversation(conversation_id),
            &GatewayEvent::MessageReceived { message: view.clone() },
        );
        self.notify_offline_participants(conversation_id, user_id, &view).await;

        Ok(view)
    }

    /// Marks a message as read on behalf of the recipient. Senders cannot
    /// read-acknowledge their own messages; repeated acknowledgments are
    /// no-ops.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn mark_read(&self, user_id: Uuid, conversation_id: Uuid, message_id: Uuid) -> Result<()> {
        self.require_participant(conversation_id, user_id).await?;

        let meta = self.repo.message_meta(conversation_id, message_id).await?.ok_or(AppError::NotFound)?;
        if meta.sender_id == user_id {
            return Err(AppError::BadRequest("Cannot mark your own message as read".into()));
        }
        if MessageStatus::parse(&meta.status) == Some(MessageStatus::Read) {
            return Ok(());
        }

        let read_at = OffsetDateTime::now_utc();
        self.repo.mark_read(message_id, read_at).await?;

        self.rooms.broadcast(
            Room::Conversation(conversation_id),
            &GatewayEvent::MessageStatusUpdate {
                message_id,
                conversation_id,
                status: MessageStatus::Read,
                read_at,
                read_by: user_id,
            },
        );
        Ok(())
    }

    /// Deletes a message. Participants see a 403 for someone else's
    /// message; a missing message is a 404 regardless of ownership.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn delete_message(&self, user_id: Uuid, conversation_id: Uuid, message_id: Uuid) -> Result<()> {
        self.require_participant(conversation_id, user_id).await?;

        let meta = self.repo.message_meta(conversation_id, message_id).await?.ok_or(AppError::NotFound)?;
        if meta.sender_id != user_id {
            return Err(AppError::Forbidden("Only the sender can delete a message".into()));
        }

        self.repo.delete_message(conversation_id, message_id).await?;

        self.rooms.broadcast(
            Room::Conversation(conversation_id),
            &GatewayEvent::MessageDeleted { conversation_id, message_id },
        );
        Ok(())
    }

    /// Deletes a conversation with all its messages and attachments. Any
    /// participant may do this.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn delete_conversation(&self, user_id: Uuid, conversation_id: Uuid) -> Result<()> {
        self.require_participant(conversation_id, user_id).await?;

        let existed = self.repo.delete_conversation(conversation_id).await?;
        if !existed {
            return Err(AppError::NotFound);
        }

        self.rooms.broadcast(
            Room::Conversation(conversation_id),
            &GatewayEvent::ConversationDeleted { conversation_id },
        );
        Ok(())
    }

    /// Membership check used by the gateway before a room join.
    pub async fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.repo.is_participant(conversation_id, user_id).await
    }

    async fn require_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<()> {
        if self.repo.is_participant(conversation_id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden("Not a participant in this conversation".into()))
        }
    }

    /// Pushes to every participant without a live gateway connection. Each
    /// delivery failure is logged and skipped; the message is already
    /// stored.
    async fn notify_offline_participants(&self, conversation_id: Uuid, sender_id: Uuid, view: &MessageView) {
        let recipients = match self.repo.other_participants(conversation_id, sender_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, %conversation_id, "Could not resolve push recipients");
                return;
            }
        };

        for recipient_id in recipients {
            if self.rooms.is_user_online(recipient_id) {
                continue;
            }
            let notification = PushNotification {
                recipient_id,
                conversation_id,
                title: format!("New message from {}", view.sender_email),
                body: view.message_text.chars().take(120).collect(),
            };
            if let Err(e) = self.push.send_push(&notification).await {
                tracing::warn!(error = %e, %recipient_id, "Push delivery failed");
            }
        }
    }
}
