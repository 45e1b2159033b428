//! Room struct definition
//!
//! A bounded set of sessions with fan-out broadcast. A room knows nothing
//! about commands or the registry; it is only ever mutated by the dispatcher.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::debug;

use crate::client::Client;
use crate::error::AppError;
use crate::message::{Message, JOINED_NOTICE, LEFT_NOTICE};
use crate::types::{Capacity, RoomId, SessionId};

/// Broadcast room
///
/// Holds a clone of each member's outbound queue keyed by session id.
/// Invariant: the member count never exceeds `capacity`.
#[derive(Debug)]
pub struct Room {
    /// Room id for identification
    pub id: RoomId,
    /// Maximum number of members
    pub capacity: Capacity,
    members: HashMap<SessionId, mpsc::Sender<Message>>,
    /// Room creation time
    pub created_at: Instant,
}

impl Room {
    /// Create an empty room with a freshly generated id
    pub fn new(capacity: Capacity) -> Self {
        Self::with_id(RoomId::generate(), capacity)
    }

    pub fn with_id(id: RoomId, capacity: Capacity) -> Self {
        Self {
            id,
            capacity,
            members: HashMap::new(),
            created_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.members.contains_key(&session_id)
    }

    /// Add a member and announce it to the others
    ///
    /// The caller guarantees `client` is not a member of any room.
    /// The joiner does not receive its own `JOINED` broadcast.
    pub async fn join(&mut self, client: &mut Client) -> Result<(), AppError> {
        if self.capacity.is_reached(self.members.len()) {
            return Err(AppError::RoomFull);
        }

        self.members.insert(client.id, client.sender.clone());
        client.room = Some(self.id.clone());
        self.broadcast(Message::new(client.id, JOINED_NOTICE)).await;

        Ok(())
    }

    /// Announce a member's departure to the others, then remove it
    ///
    /// Removing the last member leaves an empty room; the caller deletes it.
    pub async fn leave(&mut self, client: &mut Client) {
        self.broadcast(Message::new(client.id, LEFT_NOTICE)).await;
        self.members.remove(&client.id);
        client.room = None;
    }

    /// Send a message to every member except its sender
    ///
    /// The text is rewritten as `<sender id>: <text>`. Each handoff waits
    /// for room in the recipient's outbound queue.
    pub async fn broadcast(&self, mut msg: Message) {
        msg.text = format!("{}: {}", msg.sender, msg.text);

        for (member_id, sender) in &self.members {
            if *member_id == msg.sender {
                continue;
            }
            if sender.send(msg.clone()).await.is_err() {
                debug!(
                    "Outbound queue of {} closed, skipped broadcast in room {}",
                    member_id, self.id
                );
            }
        }
    }
}
