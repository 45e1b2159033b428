//! Line protocol definitions
//!
//! Every line exchanged with a client is a `Message`: inbound chat and
//! commands, outbound chat and server notices.

use std::fmt;

use crate::error::AppError;
use crate::types::SessionId;

/// Prefix of every error notice
pub const ERROR_NOTICE_PREFIX: &str = "ERR: ";

/// Confirmation and broadcast text for a room join
pub const JOINED_NOTICE: &str = "JOINED";

/// Confirmation and broadcast text for a room leave
pub const LEFT_NOTICE: &str = "LEFT";

/// One line of text attributed to the session it concerns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub sender: SessionId,
}

impl Message {
    pub fn new(sender: SessionId, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender,
        }
    }

    /// Build an `ERR: ` notice addressed to `sender`
    pub fn error(sender: SessionId, err: &AppError) -> Self {
        Self::new(sender, format!("{ERROR_NOTICE_PREFIX}{err}"))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
