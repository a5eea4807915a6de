use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Recipient has no registered delivery channel")]
    Unreachable,
    #[error("External service error: {0}")]
    Other(#[from] anyhow::Error),
}

/// A short notification handed to an out-of-band delivery channel when the
/// recipient has no live gateway connection.
#[derive(Debug, Clone)]
pub struct PushNotification {
    pub recipient_id: Uuid,
    pub conversation_id: Uuid,
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait PushProvider: Send + Sync + std::fmt::Debug {
    /// Delivers a notification to the recipient's device.
    ///
    /// # Errors
    /// Returns `PushError::Unreachable` if the recipient cannot be targeted.
    async fn send_push(&self, notification: &PushNotification) -> Result<(), PushError>;
}

/// Default provider: records the notification in the log stream. A real
/// deployment swaps in an APNs/FCM-backed implementation behind the same
/// trait.
#[derive(Debug, Default, Clone)]
pub struct LogPushProvider;

#[async_trait]
impl PushProvider for LogPushProvider {
    async fn send_push(&self, notification: &PushNotification) -> Result<(), PushError> {
        tracing::info!(
            recipient_id = %notification.recipient_id,
            conversation_id = %notification.conversation_id,
            title = %notification.title,
            "Push notification dispatched"
        );
        Ok(())
    }
}
