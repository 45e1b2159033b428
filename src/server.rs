//! ChatServer Actor implementation
//!
//! The central actor that owns the registry and runs the single dispatch loop.
//! Every admission, inbound line and disconnection arrives on one mpsc queue
//! and is processed one at a time, so the session and room tables have
//! exactly one writer.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::{default_handlers, HandlerMap};
use crate::message::Message;
use crate::registry::Registry;
use crate::session::Session;
use crate::types::SessionId;

/// Channel buffer size for the global inbound queue
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Commands delivered to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Newly accepted connection waiting for admission
    Admit(Session),
    /// Line read from an admitted session
    Inbound(Message),
    /// Session's read loop has ended
    Disconnect { session_id: SessionId },
}

/// The main ChatServer actor
pub struct ChatServer {
    config: ServerConfig,
    registry: Registry,
    handlers: HandlerMap,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
    /// Handed to forwarding tasks; weak so the queue closes once the
    /// listener and every session are gone
    sender: mpsc::WeakSender<ServerCommand>,
}

impl ChatServer {
    /// Create a ChatServer and the sender feeding its queue
    pub fn new(config: ServerConfig) -> (Self, mpsc::Sender<ServerCommand>) {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let server = Self {
            registry: Registry::new(config.max_clients),
            handlers: default_handlers(),
            config,
            receiver,
            sender: sender.downgrade(),
        };
        (server, sender)
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Admit(session) => {
                self.admit(session).await;
            }
            ServerCommand::Inbound(msg) => {
                self.dispatch(msg).await;
            }
            ServerCommand::Disconnect { session_id } => {
                self.registry.disconnect(session_id).await;
            }
        }
    }

    /// Admit a new session or turn it away when the server is full
    async fn admit(&mut self, mut session: Session) {
        if self.registry.is_full() {
            warn!(
                "Rejecting session {}: {} clients connected",
                session.id(),
                self.registry.session_count()
            );
            let (client, _inbound) = session.serve(&self.config);
            if client
                .send(Message::error(client.id, &AppError::ServerFull))
                .await
                .is_err()
            {
                debug!("Server full notice to {} dropped: outbound queue closed", client.id);
            }
            client.quit();
            return;
        }

        while self.registry.contains_session(session.id()) {
            error!("Session id {} already in use, reassigning", session.id());
            session.reassign_id();
        }

        let Some(forward_tx) = self.sender.upgrade() else {
            warn!("Inbound queue closed, dropping session {}", session.id());
            return;
        };

        let (client, mut inbound) = session.serve(&self.config);
        let session_id = client.id;

        // Relay the session's lines in order, then report its end
        tokio::spawn(async move {
            while let Some(msg) = inbound.recv().await {
                if forward_tx.send(ServerCommand::Inbound(msg)).await.is_err() {
                    debug!("Server closed, ending forwarding for {}", session_id);
                    return;
                }
            }
            if forward_tx
                .send(ServerCommand::Disconnect { session_id })
                .await
                .is_err()
            {
                debug!("Server closed before disconnect of {}", session_id);
            }
        });

        self.registry.register(client);
        self.registry.notify(session_id, session_id.to_string()).await;

        info!("New client {} joined on server", session_id);
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.registry.session_count(),
            self.registry.room_count()
        );
    }

    /// Route one inbound line: chat to the sender's room, commands to a handler
    async fn dispatch(&mut self, msg: Message) {
        let Some(command) = msg.text.strip_prefix(self.config.command_prefix.as_str()) else {
            self.registry.route_chat(msg).await;
            return;
        };

        let token = command
            .split(' ')
            .next()
            .unwrap_or_default()
            .trim_end_matches('\n');

        let Some(handler) = self.handlers.get(token) else {
            warn!("Client {} sent unknown command '{}'", msg.sender, token);
            self.registry
                .notify_error(msg.sender, &AppError::CommandNotFound)
                .await;
            return;
        };

        if let Err(e) = handler.handle(&mut self.registry, &msg).await {
            warn!("Command {:?} from {} failed: {}", msg.text, msg.sender, e);
            self.registry.notify_error(msg.sender, &e).await;
        }
    }
}
