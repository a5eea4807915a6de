//! In-process realtime fan-out. Each websocket connection registers an
//! outbound channel under the rooms it has joined; services broadcast into
//! rooms without knowing about individual sockets.

pub mod events;

pub use events::{ClientFrame, GatewayEvent};

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A broadcast target. Every connection is auto-joined to its own user room;
/// conversation rooms are joined and left explicitly by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    Conversation(Uuid),
    User(Uuid),
}

#[derive(Debug, Clone)]
struct Subscriber {
    connection_id: Uuid,
    sender: mpsc::Sender<GatewayEvent>,
}

/// Room membership for all live connections on this process.
#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<Room, Vec<Subscriber>>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, room: Room, connection_id: Uuid, sender: mpsc::Sender<GatewayEvent>) {
        let mut subscribers = self.rooms.entry(room).or_default();
        if subscribers.iter().any(|s| s.connection_id == connection_id) {
            return;
        }
        subscribers.push(Subscriber { connection_id, sender });
        tracing::debug!(?room, %connection_id, "Joined room");
    }

    pub fn leave(&self, room: Room, connection_id: Uuid) {
        if let Some(mut subscribers) = self.rooms.get_mut(&room) {
            subscribers.retain(|s| s.connection_id != connection_id);
            let emptied = subscribers.is_empty();
            drop(subscribers);
            if emptied {
                self.rooms.remove_if(&room, |_, subs| subs.is_empty());
            }
        }
    }

    /// Removes the connection from every room it joined.
    pub fn disconnect(&self, connection_id: Uuid) {
        self.rooms.retain(|_, subscribers| {
            subscribers.retain(|s| s.connection_id != connection_id);
            !subscribers.is_empty()
        });
    }

    /// Sends an event to every live subscriber of the room. Subscribers
    /// whose channels are closed or full are dropped from the room.
    pub fn broadcast(&self, room: Room, event: &GatewayEvent) {
        let Some(mut subscribers) = self.rooms.get_mut(&room) else {
            return;
        };
        subscribers.retain(|s| match s.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(?room, connection_id = %s.connection_id, "Outbound buffer full; dropping subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// True if the user has at least one live connection (their user room
    /// has a subscriber).
    #[must_use]
    pub fn is_user_online(&self, user_id: Uuid) -> bool {
        self.rooms.get(&Room::User(user_id)).is_some_and(|subs| !subs.is_empty())
    }
}
