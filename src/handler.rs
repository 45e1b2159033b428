//! Command handlers
//!
//! Each handler parses the arguments of one command and applies it to the
//! registry. Handlers are looked up by their command token, the text between
//! the command prefix and the first space.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::AppError;
use crate::message::Message;
use crate::registry::Registry;
use crate::types::{Capacity, RoomId};

/// Strategy for one command token
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Apply the command carried by `msg` on behalf of its sender
    async fn handle(&self, registry: &mut Registry, msg: &Message) -> Result<(), AppError>;
}

/// Handler table keyed by command token
pub type HandlerMap = HashMap<&'static str, Box<dyn CommandHandler>>;

/// Build the table of built-in commands
pub fn default_handlers() -> HandlerMap {
    let mut handlers: HandlerMap = HashMap::new();
    handlers.insert("ROOM", Box::new(CreateRoomHandler));
    handlers.insert("JOIN", Box::new(JoinRoomHandler));
    handlers.insert("LEAV", Box::new(LeaveRoomHandler));
    handlers
}

/// Arguments following the command token
fn command_args(text: &str) -> Vec<&str> {
    text.split_whitespace().skip(1).collect()
}

/// `ROOM [capacity]`: create a room and join it
///
/// A missing capacity, or one <= 0, creates an unbounded room.
pub struct CreateRoomHandler;

#[async_trait]
impl CommandHandler for CreateRoomHandler {
    async fn handle(&self, registry: &mut Registry, msg: &Message) -> Result<(), AppError> {
        let capacity = match command_args(&msg.text).as_slice() {
            [] => Capacity::Unbounded,
            [requested] => {
                let requested: i64 = requested.parse().map_err(|_| AppError::InvalidFormat)?;
                Capacity::from_requested(requested)
            }
            _ => return Err(AppError::InvalidFormat),
        };

        registry.create_room(msg.sender, capacity).await
    }
}

/// `JOIN <room id>`: join an existing room
pub struct JoinRoomHandler;

#[async_trait]
impl CommandHandler for JoinRoomHandler {
    async fn handle(&self, registry: &mut Registry, msg: &Message) -> Result<(), AppError> {
        let args = command_args(&msg.text);
        let [room_id] = args.as_slice() else {
            return Err(AppError::InvalidFormat);
        };
        let room_id = RoomId::from_input(room_id.trim_end_matches('\n'));

        registry.join_room(msg.sender, room_id).await
    }
}

/// `LEAV`: leave the current room
pub struct LeaveRoomHandler;

#[async_trait]
impl CommandHandler for LeaveRoomHandler {
    async fn handle(&self, registry: &mut Registry, msg: &Message) -> Result<(), AppError> {
        if !command_args(&msg.text).is_empty() {
            return Err(AppError::InvalidFormat);
        }

        registry.leave_room(msg.sender).await;
        Ok(())
    }
}
