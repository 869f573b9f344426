//! In-memory `StatusStore` implementation.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use crate::domain::{MessageCursor, StatusStore, StatusStoreError, UserId};

#[derive(Debug, Default)]
struct CursorSnapshot {
    public: MessageCursor,
    private: HashMap<UserId, MessageCursor>,
}

/// Keeps the latest cursors in process memory
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    cursors: RwLock<CursorSnapshot>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded cursor for `counterpart`
    pub fn private_cursor(&self, counterpart: &UserId) -> Option<MessageCursor> {
        let cursors = self.cursors.read().unwrap_or_else(PoisonError::into_inner);
        cursors.private.get(counterpart).cloned()
    }
}

impl StatusStore for InMemoryStatusStore {
    fn record_public_cursor(&self, cursor: &MessageCursor) -> Result<(), StatusStoreError> {
        let mut cursors = self
            .cursors
            .write()
            .map_err(|e| StatusStoreError::Unavailable(e.to_string()))?;
        cursors.public = cursor.clone();
        Ok(())
    }

    fn record_private_cursor(
        &self,
        counterpart: &UserId,
        cursor: &MessageCursor,
    ) -> Result<(), StatusStoreError> {
        let mut cursors = self
            .cursors
            .write()
            .map_err(|e| StatusStoreError::Unavailable(e.to_string()))?;
        cursors.private.insert(counterpart.clone(), cursor.clone());
        Ok(())
    }

    fn public_cursor(&self) -> MessageCursor {
        let cursors = self.cursors.read().unwrap_or_else(PoisonError::into_inner);
        cursors.public.clone()
    }
}
