//! Port to the process-wide status store.

use thiserror::Error;

use super::{MessageCursor, UserId};

#[derive(Debug, Error)]
pub enum StatusStoreError {
    #[error("status store unavailable: {0}")]
    Unavailable(String),
}

/// Best-effort sink for cursor positions, read back for status reporting
pub trait StatusStore: Send + Sync {
    fn record_public_cursor(&self, cursor: &MessageCursor) -> Result<(), StatusStoreError>;

    fn record_private_cursor(
        &self,
        counterpart: &UserId,
        cursor: &MessageCursor,
    ) -> Result<(), StatusStoreError>;

    /// Last recorded public cursor
    fn public_cursor(&self) -> MessageCursor;
}
