use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Delivery state of a message. Transitions are monotonic:
/// sent -> delivered -> read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

/// A chat message joined with its sender's identity, as returned by the
/// message-list endpoint and carried by realtime events.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_email: String,
    pub sender_role: String,
    pub message_text: String,
    pub status: MessageStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub delivered_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    pub attachments: Vec<AttachmentRef>,
}

/// A file reference parsed out of message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub url: String,
    pub name: String,
    pub mime: String,
}

const TOKEN_OPEN: &str = "[[FILE:";
const TOKEN_CLOSE: &str = "]]";

impl AttachmentRef {
    /// Extracts the first well-formed `[[FILE:<url>|<name>|<mime>]]` token
    /// from message text. Fields are `|`-delimited and may not contain `|`
    /// or `]`; malformed tokens are skipped.
    #[must_use]
    pub fn parse_token(text: &str) -> Option<Self> {
        let mut rest = text;
        while let Some(start) = rest.find(TOKEN_OPEN) {
            let inner_start = start + TOKEN_OPEN.len();
            if let Some(len) = rest[inner_start..].find(TOKEN_CLOSE) {
                let inner = &rest[inner_start..inner_start + len];
                if let Some(parsed) = Self::parse_inner(inner) {
                    return Some(parsed);
                }
                rest = &rest[inner_start + len + TOKEN_CLOSE.len()..];
            } else {
                return None;
            }
        }
        None
    }

    fn parse_inner(inner: &str) -> Option<Self> {
        if inner.contains(']') {
            return None;
        }
        let mut parts = inner.split('|');
        let url = parts.next()?;
        let name = parts.next()?;
        let mime = parts.next()?;
        if parts.next().is_some() || url.is_empty() || name.is_empty() || mime.is_empty() {
            return None;
        }
        Some(Self { url: url.to_string(), name: name.to_string(), mime: mime.to_string() })
    }
}
