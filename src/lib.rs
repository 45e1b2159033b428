//! Line-oriented TCP Room Relay Library
//!
//! Clients connect over TCP, optionally join a shared room, and every line a
//! member sends is relayed to the other members of that room.
//!
//! # Protocol
//! - On connect the server sends the client its session id
//! - `:ROOM [capacity]` creates a room and replies with its id
//! - `:JOIN <room id>` joins a room and replies `JOINED`
//! - `:LEAV` leaves the current room and replies `LEFT`
//! - Any other line is relayed to the room as `<session id>: <line>`
//! - Failures are reported as `ERR: <reason>`
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor; it alone mutates the `Registry`
//! - Each connection is a `Session` with its own read and write tasks
//! - A forwarding task per session feeds its lines into the server queue
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use room_relay::{ChatServer, ServerCommand, ServerConfig, Session};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(config.listen_addr()).await.unwrap();
//!     let (server, cmd_tx) = ChatServer::new(config);
//!
//!     tokio::spawn(server.run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let _ = cmd_tx.send(ServerCommand::Admit(Session::new(stream))).await;
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use config::ServerConfig;
pub use error::{AppError, ConfigError, SendError};
pub use handler::{default_handlers, CommandHandler};
pub use message::Message;
pub use registry::Registry;
pub use room::Room;
pub use server::{ChatServer, ServerCommand};
pub use session::Session;
pub use types::{Capacity, RoomId, SessionId};
