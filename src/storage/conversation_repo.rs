use crate::domain::message::AttachmentRef;
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::conversation::SummaryRecord;
use crate::storage::records::message::{MessageMeta, MessageRecord, MessageWithSender};
use sqlx::Acquire;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ConversationRepository {
    pool: DbPool,
}

impl ConversationRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM conversation_participants WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Finds an existing conversation containing exactly this unordered pair.
    pub async fn find_for_pair(&self, a: Uuid, b: Uuid) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r"
            SELECT c.id
            FROM conversations c
            INNER JOIN conversation_participants cp1 ON c.id = cp1.conversation_id
            INNER JOIN conversation_participants cp2 ON c.id = cp2.conversation_id
            WHERE cp1.user_id = $1 AND cp2.user_id = $2
            LIMIT 1
            ",
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    /// Atomically creates a conversation plus its two participant rows.
    /// Returns `None` when another request won the unique-key race, in which
    /// case the caller re-fetches the existing conversation.
    pub async fn create_with_participants(&self, a: Uuid, b: Uuid, participant_key: &str) -> Result<Option<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO conversations (participant_key)
            VALUES ($1)
            ON CONFLICT (participant_key) WHERE participant_key IS NOT NULL DO NOTHING
            RETURNING id
            ",
        )
        .bind(participant_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = id else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("INSERT INTO conversation_participants (user_id, conversation_id) VALUES ($1, $3), ($2, $3)")
            .bind(a)
            .bind(b)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(id))
    }

    pub async fn summaries_for_user(&self, user_id: Uuid) -> Result<Vec<SummaryRecord>> {
        let rows = sqlx::query_as::<_, SummaryRecord>(
            r"
            SELECT DISTINCT
                c.id AS conversation_id,
                c.last_message_at,
                c.created_at,
                u.id AS other_user_id,
                u.email AS other_user_email,
                u.role AS other_user_role,
                m.message_text AS last_message,
                m.sender_id AS last_message_sender_id
            FROM conversations c
            INNER JOIN conversation_participants cp1 ON c.id = cp1.conversation_id
            INNER JOIN conversation_participants cp2 ON c.id = cp2.conversation_id
            INNER JOIN users u ON cp2.user_id = u.id
            LEFT JOIN messages m ON c.id = m.conversation_id
                AND m.created_at = c.last_message_at
            WHERE cp1.user_id = $1
                AND cp2.user_id != $1
            ORDER BY c.last_message_at DESC NULLS LAST, c.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Fetches one page of messages, newest first. The caller reverses the
    /// page to present oldest-first.
    pub async fn messages_page(&self, conversation_id: Uuid, limit: i64, offset: i64) -> Result<Vec<MessageWithSender>> {
        let rows = sqlx::query_as::<_, MessageWithSender>(
            r"
            SELECT
                m.id,
                m.conversation_id,
                m.sender_id,
                u.email AS sender_email,
                u.role AS sender_role,
                m.message_text,
                m.status,
                m.created_at,
                m.delivered_at,
                m.read_at
            FROM messages m
            INNER JOIN users u ON m.sender_id = u.id
            WHERE m.conversation_id = $1
            ORDER BY m.created_at DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Inserts a message (delivered immediately; there is no separate
    /// delivery acknowledgment), persists its attachment if one was parsed,
    /// and bumps the conversation's last-activity timestamp — all in one
    /// transaction. A failed attachment insert is rolled back to a savepoint
    /// and logged; the message itself survives.
    pub async fn create_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        text: &str,
        attachment: Option<&AttachmentRef>,
    ) -> Result<MessageRecord> {
        let mut tx = self.pool.begin().await?;
        let now = OffsetDateTime::now_utc();

        let message = sqlx::query_as::<_, MessageRecord>(
            r"
            INSERT INTO messages (conversation_id, sender_id, message_text, status, created_at, delivered_at)
            VALUES ($1, $2, $3, 'delivered', $4, $4)
            RETURNING id, conversation_id, sender_id, message_text, status, created_at, delivered_at, read_at
            ",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(text)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(att) = attachment {
            match tx.begin().await {
                Ok(mut savepoint) => {
                    let inserted =
                        sqlx::query("INSERT INTO message_attachments (message_id, url, name, mime) VALUES ($1, $2, $3, $4)")
                            .bind(message.id)
                            .bind(&att.url)
                            .bind(&att.name)
                            .bind(&att.mime)
                            .execute(&mut *savepoint)
                            .await;
                    match inserted {
                        Ok(_) => savepoint.commit().await?,
                        Err(e) => {
                            tracing::warn!(error = %e, message_id = %message.id, "Attachment insert failed; keeping message");
                            savepoint.rollback().await?;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, message_id = %message.id, "Could not open attachment savepoint");
                }
            }
        }

        sqlx::query("UPDATE conversations SET last_message_at = $1 WHERE id = $2")
            .bind(now)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    pub async fn message_meta(&self, conversation_id: Uuid, message_id: Uuid) -> Result<Option<MessageMeta>> {
        let meta = sqlx::query_as::<_, MessageMeta>(
            "SELECT sender_id, status, created_at FROM messages WHERE id = $1 AND conversation_id = $2",
        )
        .bind(message_id)
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(meta)
    }

    pub async fn mark_read(&self, message_id: Uuid, read_at: OffsetDateTime) -> Result<()> {
        sqlx::query("UPDATE messages SET read_at = $1, status = 'read' WHERE id = $2")
            .bind(read_at)
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes a message and its attachments, then recomputes the
    /// conversation's last-activity timestamp from the remaining messages.
    pub async fn delete_message(&self, conversation_id: Uuid, message_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM message_attachments WHERE message_id = $1")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM messages WHERE id = $1").bind(message_id).execute(&mut *tx).await?;

        let latest: Option<OffsetDateTime> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM messages WHERE conversation_id = $1")
                .bind(conversation_id)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("UPDATE conversations SET last_message_at = $1 WHERE id = $2")
            .bind(latest)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a conversation and everything under it. Returns `false` if
    /// the conversation row did not exist.
    pub async fn delete_conversation(&self, conversation_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            DELETE FROM message_attachments
            WHERE message_id IN (SELECT id FROM messages WHERE conversation_id = $1)
            ",
        )
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM conversation_participants WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    pub async fn other_participants(&self, conversation_id: Uuid, excluding: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM conversation_participants WHERE conversation_id = $1 AND user_id != $2",
        )
        .bind(conversation_id)
        .bind(excluding)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
