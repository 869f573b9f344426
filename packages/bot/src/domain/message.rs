//! Chat message entity as seen by the poller.

use super::{MessageId, Timestamp, UserId};

/// A message fetched from the public room or a private thread.
///
/// Read once, used to advance cursors and dispatch, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sent_at: Timestamp,
    /// Resolved sender; `None` when the record carried no usable identifier
    pub sender: Option<UserId>,
    pub text: Option<String>,
    pub is_private_message: bool,
}

impl ChatMessage {
    /// Chat text with surrounding whitespace removed; empty when absent.
    pub fn extract_text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or_default()
    }

    /// Whether the message was authored by `user`
    pub fn is_from(&self, user: &UserId) -> bool {
        self.sender.as_ref() == Some(user)
    }
}
