use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Result of the idempotent create-or-get operation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationHandle {
    pub conversation_id: Uuid,
    pub created: bool,
}

/// One row of a user's conversation list: the other participant plus a
/// preview of the latest message, ordered by last activity.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub other_user_id: Uuid,
    pub other_user_email: String,
    pub other_user_role: String,
    pub last_message: Option<String>,
    pub last_message_sender_id: Option<Uuid>,
}

/// Deterministic key for an unordered participant pair. Backed by a unique
/// index so two concurrent create-or-get calls cannot both insert.
#[must_use]
pub fn participant_key(a: Uuid, b: Uuid) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{low}:{high}")
}
