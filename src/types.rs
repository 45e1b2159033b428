//! Basic type definitions for the relay server
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: UUID-based unique session identifier
//! - `RoomId`: 6-character alphanumeric room id
//! - `Capacity`: bounded or unbounded room size

use std::fmt;

use rand::Rng;
use uuid::Uuid;

/// Characters a room id is drawn from
const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated room id
const ROOM_ID_LENGTH: usize = 6;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe session identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room id (6-character uppercase alphanumeric)
///
/// Generated randomly on room creation or parsed from a `:JOIN` argument.
/// Uniqueness among open rooms is checked by the registry, not assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(pub String);

impl RoomId {
    /// Generate a new random room id
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..ROOM_ID_LENGTH)
            .map(|_| ROOM_ID_ALPHABET[rng.gen_range(0..ROOM_ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Create a RoomId from client input (converts to uppercase)
    pub fn from_input(id: &str) -> Self {
        Self(id.to_uppercase())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maximum number of members a room admits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Bounded(usize),
    Unbounded,
}

impl Capacity {
    /// Normalize a requested capacity; anything <= 0 means unbounded.
    pub fn from_requested(requested: i64) -> Self {
        if requested <= 0 {
            Capacity::Unbounded
        } else {
            Capacity::Bounded(usize::try_from(requested).unwrap_or(usize::MAX))
        }
    }

    /// Whether `members` already fills this capacity
    pub fn is_reached(&self, members: usize) -> bool {
        match self {
            Capacity::Bounded(max) => members >= *max,
            Capacity::Unbounded => false,
        }
    }
}
