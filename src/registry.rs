//! Registry of sessions and rooms
//!
//! Owns the session and room tables and every operation that mutates them.
//! It is owned by the `ChatServer` dispatcher, so all mutations are
//! serialized through the dispatch loop without locks.
//!
//! Invariants after every operation:
//! - every member of a room has its `room` set to that room's id
//! - every client with `room` set is a member of exactly that room
//! - a room with no members is not in the table

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::error::AppError;
use crate::message::{Message, JOINED_NOTICE, LEFT_NOTICE};
use crate::room::Room;
use crate::types::{Capacity, RoomId, SessionId};

/// Session and room tables
#[derive(Debug)]
pub struct Registry {
    /// Maximum number of admitted sessions
    max_clients: usize,
    /// All admitted sessions: SessionId -> Client
    clients: HashMap<SessionId, Client>,
    /// All open rooms: RoomId -> Room
    rooms: HashMap<RoomId, Room>,
}

impl Registry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            max_clients,
            clients: HashMap::new(),
            rooms: HashMap::new(),
        }
    }

    /// Whether the session limit has been reached
    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    pub fn contains_session(&self, id: SessionId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn session_count(&self) -> usize {
        self.clients.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn client(&self, id: SessionId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Add an admitted session to the table
    pub fn register(&mut self, client: Client) {
        self.clients.insert(client.id, client);
    }

    /// Send a notice to one session, logging if its write loop is gone
    pub async fn notify(&self, id: SessionId, text: impl Into<String>) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        if client.notify(text).await.is_err() {
            debug!("Notice to {} dropped: outbound queue closed", id);
        }
    }

    /// Send an `ERR: ` notice to one session
    pub async fn notify_error(&self, id: SessionId, err: &AppError) {
        self.notify(id, Message::error(id, err).text).await;
    }

    /// Relay a chat line to the sender's room
    ///
    /// Lines from a session that is not in a room are dropped.
    pub async fn route_chat(&self, msg: Message) {
        let Some(client) = self.clients.get(&msg.sender) else {
            warn!("Message not sent: unknown client {}", msg.sender);
            return;
        };
        let Some(room_id) = &client.room else {
            warn!(
                "Message not sent: client {} not in a room ({:?})",
                msg.sender, msg.text
            );
            return;
        };
        let Some(room) = self.rooms.get(room_id) else {
            error!("Client {} references missing room {}", msg.sender, room_id);
            return;
        };

        room.broadcast(msg).await;
    }

    /// Create a room with a fresh id and join its creator to it
    pub async fn create_room(
        &mut self,
        client_id: SessionId,
        capacity: Capacity,
    ) -> Result<(), AppError> {
        self.create_room_with_id(client_id, RoomId::generate(), capacity)
            .await
    }

    /// Create a room with the given id and join its creator to it
    ///
    /// An id already used by an open room fails the creation.
    pub async fn create_room_with_id(
        &mut self,
        client_id: SessionId,
        room_id: RoomId,
        capacity: Capacity,
    ) -> Result<(), AppError> {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return Ok(());
        };

        if client.in_room() {
            info!("Creating a room: client {} already in another room", client_id);
            return Err(AppError::AlreadyInRoom);
        }

        if self.rooms.contains_key(&room_id) {
            error!("Creating room with id {} failed: id in use", room_id);
            return Err(AppError::RoomCreationFailed);
        }

        let mut room = Room::with_id(room_id.clone(), capacity);
        room.join(client).await?;
        self.rooms.insert(room_id.clone(), room);
        info!("Client {} created room {} ({:?})", client_id, room_id, capacity);

        self.notify(client_id, room_id.0).await;
        Ok(())
    }

    /// Join an existing room
    pub async fn join_room(&mut self, client_id: SessionId, room_id: RoomId) -> Result<(), AppError> {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return Ok(());
        };

        if client.in_room() {
            info!("Joining a room: client {} already in another room", client_id);
            return Err(AppError::AlreadyInRoom);
        }

        let Some(room) = self.rooms.get_mut(&room_id) else {
            info!("Joining a room: room {} does not exist", room_id);
            return Err(AppError::RoomNotFound);
        };

        if let Err(e) = room.join(client).await {
            info!("Client {} could not join room {}: {}", client_id, room_id, e);
            return Err(e);
        }

        info!("Client {} joined room {}", client_id, room_id);
        self.notify(client_id, JOINED_NOTICE).await;
        Ok(())
    }

    /// Leave the current room, if any, and confirm with `LEFT`
    pub async fn leave_room(&mut self, client_id: SessionId) {
        self.remove_from_room(client_id).await;
        self.notify(client_id, LEFT_NOTICE).await;
    }

    /// Remove a session from its room, deleting the room once empty
    async fn remove_from_room(&mut self, client_id: SessionId) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };
        let Some(room_id) = client.room.clone() else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            error!("Client {} references missing room {}", client_id, room_id);
            client.room = None;
            return;
        };

        room.leave(client).await;
        info!("Client {} left room {}", client_id, room_id);

        if room.is_empty() {
            self.delete_room(&room_id);
        }
    }

    fn delete_room(&mut self, room_id: &RoomId) {
        if let Some(room) = self.rooms.remove(room_id) {
            info!(
                "Room {} deleted after {:?}",
                room_id,
                room.created_at.elapsed()
            );
        }
    }

    /// Remove a session from its room and the table and close its connection
    pub async fn disconnect(&mut self, client_id: SessionId) {
        self.remove_from_room(client_id).await;

        if let Some(client) = self.clients.remove(&client_id) {
            client.quit();
        }

        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Panic if the membership invariants do not hold
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        for (room_id, room) in &self.rooms {
            assert!(!room.is_empty(), "empty room {} still registered", room_id);
            if let Capacity::Bounded(max) = room.capacity {
                assert!(room.len() <= max, "room {} over capacity", room_id);
            }
        }
        let mut members_per_room: HashMap<&RoomId, usize> = HashMap::new();
        for client in self.clients.values() {
            if let Some(room_id) = &client.room {
                let room = self
                    .rooms
                    .get(room_id)
                    .unwrap_or_else(|| panic!("client {} in missing room", client.id));
                assert!(room.contains(client.id));
                *members_per_room.entry(room_id).or_default() += 1;
            }
        }
        for (room_id, room) in &self.rooms {
            assert_eq!(members_per_room.get(room_id).copied().unwrap_or(0), room.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn add_client(registry: &mut Registry) -> (SessionId, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(32);
        let id = SessionId::new();
        registry.register(Client::new(id, tx, CancellationToken::new()));
        (id, rx)
    }

    fn next_text(rx: &mut mpsc::Receiver<Message>) -> String {
        rx.try_recv().expect("expected a queued message").text
    }

    #[tokio::test]
    async fn test_create_room_confirms_with_id() {
        let mut registry = Registry::new(10);
        let (a, mut a_rx) = add_client(&mut registry);

        registry.create_room(a, Capacity::Unbounded).await.unwrap();

        let room_id = RoomId(next_text(&mut a_rx));
        assert_eq!(registry.client(a).unwrap().room, Some(room_id.clone()));
        assert!(registry.room(&room_id).unwrap().contains(a));
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_create_room_while_in_room() {
        let mut registry = Registry::new(10);
        let (a, mut a_rx) = add_client(&mut registry);
        registry.create_room(a, Capacity::Unbounded).await.unwrap();
        let room_id = RoomId(next_text(&mut a_rx));

        let result = registry.create_room(a, Capacity::Unbounded).await;

        assert_eq!(result, Err(AppError::AlreadyInRoom));
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.client(a).unwrap().room, Some(room_id));
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_create_room_id_collision() {
        let mut registry = Registry::new(10);
        let (a, _a_rx) = add_client(&mut registry);
        let (b, _b_rx) = add_client(&mut registry);
        let id = RoomId("ABC123".to_string());

        registry
            .create_room_with_id(a, id.clone(), Capacity::Unbounded)
            .await
            .unwrap();
        let result = registry
            .create_room_with_id(b, id.clone(), Capacity::Unbounded)
            .await;

        assert_eq!(result, Err(AppError::RoomCreationFailed));
        assert!(registry.client(b).unwrap().room.is_none());
        assert_eq!(registry.room(&id).unwrap().len(), 1);
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let mut registry = Registry::new(10);
        let (a, _a_rx) = add_client(&mut registry);

        let result = registry.join_room(a, RoomId("NOPE00".to_string())).await;

        assert_eq!(result, Err(AppError::RoomNotFound));
        assert!(registry.client(a).unwrap().room.is_none());
    }

    #[tokio::test]
    async fn test_join_full_room_leaves_membership_unchanged() {
        let mut registry = Registry::new(10);
        let (a, mut a_rx) = add_client(&mut registry);
        let (b, mut b_rx) = add_client(&mut registry);
        let (c, _c_rx) = add_client(&mut registry);
        registry.create_room(a, Capacity::Bounded(2)).await.unwrap();
        let room_id = RoomId(next_text(&mut a_rx));

        registry.join_room(b, room_id.clone()).await.unwrap();
        assert_eq!(next_text(&mut b_rx), JOINED_NOTICE);
        assert_eq!(next_text(&mut a_rx), format!("{}: JOINED", b));

        let result = registry.join_room(c, room_id.clone()).await;

        assert_eq!(result, Err(AppError::RoomFull));
        assert_eq!(registry.room(&room_id).unwrap().len(), 2);
        assert!(registry.client(c).unwrap().room.is_none());
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_join_while_in_room() {
        let mut registry = Registry::new(10);
        let (a, mut a_rx) = add_client(&mut registry);
        let (b, mut b_rx) = add_client(&mut registry);
        registry.create_room(a, Capacity::Unbounded).await.unwrap();
        let first = RoomId(next_text(&mut a_rx));
        registry.create_room(b, Capacity::Unbounded).await.unwrap();
        let second = RoomId(next_text(&mut b_rx));

        let result = registry.join_room(a, second).await;

        assert_eq!(result, Err(AppError::AlreadyInRoom));
        assert_eq!(registry.client(a).unwrap().room, Some(first));
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_last_leave_deletes_room() {
        let mut registry = Registry::new(10);
        let (a, mut a_rx) = add_client(&mut registry);
        let (b, _b_rx) = add_client(&mut registry);
        registry.create_room(a, Capacity::Unbounded).await.unwrap();
        let room_id = RoomId(next_text(&mut a_rx));

        registry.leave_room(a).await;

        assert_eq!(next_text(&mut a_rx), LEFT_NOTICE);
        assert_eq!(registry.room_count(), 0);
        assert_eq!(
            registry.join_room(b, room_id).await,
            Err(AppError::RoomNotFound)
        );
        registry.assert_consistent();
    }

    #[tokio::test]
    async fn test_leave_without_room_is_idempotent() {
        let mut registry = Registry::new(10);
        let (a, mut a_rx) = add_client(&mut registry);

        registry.leave_room(a).await;
        registry.leave_room(a).await;

        assert_eq!(next_text(&mut a_rx), LEFT_NOTICE);
        assert_eq!(next_text(&mut a_rx), LEFT_NOTICE);
        assert!(a_rx.try_recv().is_err());
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_notifies_room_and_removes_session() {
        let mut registry = Registry::new(10);
        let (a, mut a_rx) = add_client(&mut registry);
        let (b, _b_rx) = add_client(&mut registry);
        registry.create_room(a, Capacity::Unbounded).await.unwrap();
        let room_id = RoomId(next_text(&mut a_rx));
        registry.join_room(b, room_id.clone()).await.unwrap();
        next_text(&mut a_rx);

        registry.disconnect(b).await;

        assert_eq!(next_text(&mut a_rx), format!("{}: LEFT", b));
        assert!(!registry.contains_session(b));
        assert_eq!(registry.room(&room_id).unwrap().len(), 1);
        registry.assert_consistent();

        registry.disconnect(a).await;
        assert_eq!(registry.room_count(), 0);
        assert_eq!(registry.session_count(), 0);

        // Unknown ids are ignored
        registry.disconnect(a).await;
    }

    #[tokio::test]
    async fn test_chat_outside_room_is_dropped() {
        let mut registry = Registry::new(10);
        let (a, mut a_rx) = add_client(&mut registry);
        let (_b, mut b_rx) = add_client(&mut registry);

        registry.route_chat(Message::new(a, "hello")).await;

        assert!(a_rx.try_recv().is_err());
        assert!(b_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_chat_reaches_room_members() {
        let mut registry = Registry::new(10);
        let (a, mut a_rx) = add_client(&mut registry);
        let (b, mut b_rx) = add_client(&mut registry);
        let (_c, mut c_rx) = add_client(&mut registry);
        registry.create_room(a, Capacity::Unbounded).await.unwrap();
        let room_id = RoomId(next_text(&mut a_rx));
        registry.join_room(b, room_id).await.unwrap();
        next_text(&mut a_rx);
        next_text(&mut b_rx);

        registry.route_chat(Message::new(b, "hi all")).await;

        assert_eq!(next_text(&mut a_rx), format!("{}: hi all", b));
        assert!(b_rx.try_recv().is_err());
        assert!(c_rx.try_recv().is_err());
    }

    #[test]
    fn test_is_full() {
        let mut registry = Registry::new(1);
        assert!(!registry.is_full());
        add_client(&mut registry);
        assert!(registry.is_full());
    }
}
