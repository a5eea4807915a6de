use crate::domain::message::{MessageStatus, MessageView};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Server-to-client frames, discriminated by the `event` field.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GatewayEvent {
    MessageReceived {
        #[serde(flatten)]
        message: MessageView,
    },
    MessageStatusUpdate {
        #[serde(rename = "messageId")]
        message_id: Uuid,
        #[serde(rename = "conversationId")]
        conversation_id: Uuid,
        status: MessageStatus,
        #[serde(rename = "readAt", with = "time::serde::rfc3339")]
        read_at: OffsetDateTime,
        #[serde(rename = "readBy")]
        read_by: Uuid,
    },
    MessageDeleted {
        conversation_id: Uuid,
        message_id: Uuid,
    },
    ConversationDeleted {
        conversation_id: Uuid,
    },
}

/// Client-to-server frames, discriminated by the `action` field. Clients
/// only manage their room subscriptions; everything else goes over REST.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinConversation { conversation_id: Uuid },
    LeaveConversation { conversation_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_carry_their_discriminator() {
        let event = GatewayEvent::ConversationDeleted { conversation_id: Uuid::nil() };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "conversation_deleted");
        assert_eq!(value["conversation_id"], "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn message_received_fields_sit_at_the_top_level() {
        let event = GatewayEvent::MessageReceived {
            message: MessageView {
                id: Uuid::nil(),
                conversation_id: Uuid::nil(),
                sender_id: Uuid::nil(),
                sender_email: "a@example.com".to_string(),
                sender_role: "candidate".to_string(),
                message_text: "hello".to_string(),
                status: MessageStatus::Delivered,
                created_at: OffsetDateTime::UNIX_EPOCH,
                delivered_at: Some(OffsetDateTime::UNIX_EPOCH),
                read_at: None,
                attachments: Vec::new(),
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "message_received");
        assert_eq!(value["message_text"], "hello");
        assert_eq!(value["sender_email"], "a@example.com");
        assert!(value.get("message").is_none());
    }

    #[test]
    fn status_update_uses_camel_case_payload() {
        let event = GatewayEvent::MessageStatusUpdate {
            message_id: Uuid::nil(),
            conversation_id: Uuid::nil(),
            status: MessageStatus::Read,
            read_at: OffsetDateTime::UNIX_EPOCH,
            read_by: Uuid::nil(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "message_status_update");
        assert_eq!(value["status"], "read");
        assert!(value.get("messageId").is_some());
        assert!(value.get("readBy").is_some());
    }

    #[test]
    fn client_frames_parse_by_action() {
        let frame: ClientFrame = serde_json::from_value(json!({
            "action": "join_conversation",
            "conversation_id": "00000000-0000-0000-0000-000000000000",
        }))
        .unwrap();
        assert!(matches!(frame, ClientFrame::JoinConversation { .. }));
    }
}
