//! Video-room presence signaling.
//!
//! A room is keyed by booking id. The server only tracks who is in the
//! room and tells the others when someone joins or leaves; media flows
//! through the external meeting provider behind the booking's link.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RoomEvent {
    PeerJoined { participant: Uuid },
    PeerLeft { participant: Uuid },
}

#[async_trait]
pub trait RoomSignaling: Send + Sync {
    /// Enter `room` and receive presence events for everyone else in it.
    /// Rejoining replaces the previous receiver.
    async fn join(&self, room: Uuid, participant: Uuid) -> mpsc::Receiver<RoomEvent>;

    async fn leave(&self, room: Uuid, participant: Uuid);

    async fn participants(&self, room: Uuid) -> Vec<Uuid>;
}

#[derive(Default)]
struct Room {
    members: HashMap<Uuid, mpsc::Sender<RoomEvent>>,
}

impl Room {
    /// Deliver `event` to everyone except `origin`. Slow or gone receivers
    /// miss the event.
    fn broadcast(&self, room: Uuid, origin: Uuid, event: &RoomEvent) {
        for (member, tx) in &self.members {
            if *member == origin {
                continue;
            }
            if tx.try_send(event.clone()).is_err() {
                debug!(room = %room, target = %member, "Dropping room event");
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryRooms {
    rooms: RwLock<HashMap<Uuid, Room>>,
}

impl InMemoryRooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[async_trait]
impl RoomSignaling for InMemoryRooms {
    async fn join(&self, room: Uuid, participant: Uuid) -> mpsc::Receiver<RoomEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let mut rooms = self.rooms.write().await;
        let entry = rooms.entry(room).or_default();
        let rejoin = entry.members.insert(participant, tx).is_some();

        if !rejoin {
            entry.broadcast(room, participant, &RoomEvent::PeerJoined { participant });
        }

        info!(
            room = %room,
            participant = %participant,
            participants = entry.members.len(),
            "Participant joined room"
        );
        rx
    }

    /// Leaving the last seat removes the room.
    async fn leave(&self, room: Uuid, participant: Uuid) {
        let mut rooms = self.rooms.write().await;
        let Some(entry) = rooms.get_mut(&room) else {
            return;
        };
        if entry.members.remove(&participant).is_none() {
            return;
        }

        entry.broadcast(room, participant, &RoomEvent::PeerLeft { participant });
        info!(
            room = %room,
            participant = %participant,
            participants = entry.members.len(),
            "Participant left room"
        );

        if entry.members.is_empty() {
            rooms.remove(&room);
            info!(room = %room, "Removed empty room");
        }
    }

    async fn participants(&self, room: Uuid) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .rooms
            .read()
            .await
            .get(&room)
            .map(|r| r.members.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}
