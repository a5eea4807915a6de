use crate::domain::message::{AttachmentRef, MessageStatus, MessageView};
use time::OffsetDateTime;
use uuid::Uuid;

/// A message row joined with the sender's identity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageWithSender {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_email: String,
    pub sender_role: String,
    pub message_text: String,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub delivered_at: Option<OffsetDateTime>,
    pub read_at: Option<OffsetDateTime>,
}

impl MessageWithSender {
    /// Converts into the API view, deriving the attachment list from the
    /// embedded file token.
    #[must_use]
    pub fn into_view(self) -> MessageView {
        let attachments = AttachmentRef::parse_token(&self.message_text).into_iter().collect();
        MessageView {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            sender_email: self.sender_email,
            sender_role: self.sender_role,
            status: MessageStatus::parse(&self.status).unwrap_or(MessageStatus::Sent),
            message_text: self.message_text,
            created_at: self.created_at,
            delivered_at: self.delivered_at,
            read_at: self.read_at,
            attachments,
        }
    }
}

/// A bare message row as returned by the insert, before the sender's
/// identity is joined in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRecord {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub message_text: String,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub delivered_at: Option<OffsetDateTime>,
    pub read_at: Option<OffsetDateTime>,
}

impl MessageRecord {
    #[must_use]
    pub fn with_sender(self, email: String, role: String) -> MessageWithSender {
        MessageWithSender {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            sender_email: email,
            sender_role: role,
            message_text: self.message_text,
            status: self.status,
            created_at: self.created_at,
            delivered_at: self.delivered_at,
            read_at: self.read_at,
        }
    }
}

/// Sender, status, and creation time of a message; enough for the read and
/// delete authorization checks.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageMeta {
    pub sender_id: Uuid,
    pub status: String,
    pub created_at: OffsetDateTime,
}
