//! Mailbox messages exchanged between the two users.

use serde::{Deserialize, Serialize};

use super::{MessageId, UserRole};

/// A message on the shared board.
///
/// The sender is fixed at construction and the read flag can only go from
/// unread to read, so both are private with accessor methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub text: String,
    /// Sent time, milliseconds since the epoch.
    #[serde(default, deserialize_with = "super::lenient::millis")]
    pub date: i64,
    #[serde(default)]
    read: bool,
    sender: UserRole,
}

impl Message {
    /// Build an unread message with a known identifier.
    #[must_use]
    pub fn new(id: MessageId, text: impl Into<String>, date: i64, sender: UserRole) -> Self {
        Self {
            id,
            text: text.into(),
            date,
            read: false,
            sender,
        }
    }

    /// Compose a new unread message with a fresh identifier.
    #[must_use]
    pub fn compose(text: impl Into<String>, sender: UserRole, date: i64) -> Self {
        Self::new(MessageId::generate(), text, date, sender)
    }

    /// Whether the recipient has read this message.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read
    }

    /// Mark the message as read. There is no way back.
    pub const fn mark_read(&mut self) {
        self.read = true;
    }

    /// Who wrote the message.
    #[must_use]
    pub const fn sender(&self) -> UserRole {
        self.sender
    }

    /// Whether `role` should see this message as incoming.
    #[must_use]
    pub fn is_incoming_for(&self, role: UserRole) -> bool {
        self.sender == role.counterpart()
    }
}
