//! Error types for the relay server
//!
//! Defines client-visible errors, outbound send errors and configuration errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Client-visible errors
///
/// The `Display` text of every variant is the reason sent to the client
/// after the `ERR: ` prefix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    /// Global session limit reached
    #[error("The server is full")]
    ServerFull,

    /// Generated room id collided with an open room
    #[error("Creating room failed")]
    RoomCreationFailed,

    /// Client is already a member of a room
    #[error("Client already in room")]
    AlreadyInRoom,

    /// No open room with the given id
    #[error("Room not exists")]
    RoomNotFound,

    /// No handler registered for the command token
    #[error("Command not exists")]
    CommandNotFound,

    /// Room capacity already reached
    #[error("Room is full")]
    RoomFull,

    /// Malformed command arguments
    #[error("Invalid command format")]
    InvalidFormat,
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for `ServerConfig`
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field is out of its accepted range
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
