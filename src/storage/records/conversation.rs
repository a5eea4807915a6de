use crate::domain::conversation::ConversationSummary;
use time::OffsetDateTime;
use uuid::Uuid;

/// One conversation joined with the other participant and the latest
/// message preview.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SummaryRecord {
    pub conversation_id: Uuid,
    pub last_message_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub other_user_id: Uuid,
    pub other_user_email: String,
    pub other_user_role: String,
    pub last_message: Option<String>,
    pub last_message_sender_id: Option<Uuid>,
}

impl From<SummaryRecord> for ConversationSummary {
    fn from(record: SummaryRecord) -> Self {
        Self {
            conversation_id: record.conversation_id,
            last_message_at: record.last_message_at,
            created_at: record.created_at,
            other_user_id: record.other_user_id,
            other_user_email: record.other_user_email,
            other_user_role: record.other_user_role,
            last_message: record.last_message,
            last_message_sender_id: record.last_message_sender_id,
        }
    }
}
