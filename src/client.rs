//! Client struct definition
//!
//! The registry's record of an admitted session: its id, current room,
//! outbound message channel and the signal that stops its read loop.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::SendError;
use crate::message::Message;
use crate::types::{RoomId, SessionId};

/// Admitted session as seen by the registry
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Room the session is currently a member of
    pub room: Option<RoomId>,
    /// Server -> session outbound queue
    pub sender: mpsc::Sender<Message>,
    shutdown: CancellationToken,
}

impl Client {
    pub fn new(id: SessionId, sender: mpsc::Sender<Message>, shutdown: CancellationToken) -> Self {
        Self {
            id,
            room: None,
            sender,
            shutdown,
        }
    }

    /// Hand a message to this session's write loop
    ///
    /// Waits while the outbound queue is full. Returns an error if the
    /// write loop has ended.
    pub async fn send(&self, msg: Message) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Send a notice addressed to this session
    pub async fn notify(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.send(Message::new(self.id, text)).await
    }

    pub fn in_room(&self) -> bool {
        self.room.is_some()
    }

    /// Close the connection
    ///
    /// Stops both loops and drops the outbound queue. The write loop gets a
    /// short, bounded window to flush what is already queued, then the
    /// connection is dropped whether or not the peer is reading.
    pub fn quit(self) {
        self.shutdown.cancel();
        info!("The client {} has left the server", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let client = Client::new(SessionId::new(), tx, CancellationToken::new());

        assert!(client.room.is_none());
        assert!(!client.in_room());
    }

    #[tokio::test]
    async fn test_notify_is_attributed_to_client() {
        let (tx, mut rx) = mpsc::channel(32);
        let client = Client::new(SessionId::new(), tx, CancellationToken::new());

        client.notify("LEFT").await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.text, "LEFT");
        assert_eq!(msg.sender, client.id);
    }

    #[tokio::test]
    async fn test_send_to_closed_channel() {
        let (tx, rx) = mpsc::channel(32);
        let client = Client::new(SessionId::new(), tx, CancellationToken::new());
        drop(rx);

        assert!(matches!(
            client.notify("x").await,
            Err(SendError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_quit_cancels_shutdown() {
        let (tx, _rx) = mpsc::channel(32);
        let token = CancellationToken::new();
        let client = Client::new(SessionId::new(), tx, token.clone());

        client.quit();

        assert!(token.is_cancelled());
    }
}
