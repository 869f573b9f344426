//! "Last seen" bookmarks for the public room and each private thread.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{ChatMessage, MessageId, Timestamp, UserId};

/// How far a channel has been consumed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCursor {
    pub last_message_id: Option<MessageId>,
    pub last_timestamp: Option<Timestamp>,
}

impl MessageCursor {
    /// Whether `message` is at or behind this cursor.
    ///
    /// Callers compare against the cursor as it was before the fetch, so that
    /// several messages sharing one timestamp in a single batch all pass.
    pub fn has_seen(&self, message: &ChatMessage) -> bool {
        if self.last_message_id.as_ref() == Some(&message.id) {
            return true;
        }
        self.last_timestamp
            .is_some_and(|timestamp| message.sent_at < timestamp)
    }

    /// Move the cursor forward. A timestamp behind the stored one is refused.
    fn advance(&mut self, id: MessageId, timestamp: Timestamp) -> bool {
        if self
            .last_timestamp
            .is_some_and(|current| timestamp < current)
        {
            return false;
        }
        self.last_message_id = Some(id);
        self.last_timestamp = Some(timestamp);
        true
    }
}

/// One public cursor plus a lazily created cursor per private counterpart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorStore {
    public: MessageCursor,
    private: HashMap<UserId, MessageCursor>,
    /// Ids recorded at each private cursor's current timestamp
    private_boundary: HashMap<UserId, HashSet<MessageId>>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public(&self) -> &MessageCursor {
        &self.public
    }

    pub fn private(&self, counterpart: &UserId) -> Option<&MessageCursor> {
        self.private.get(counterpart)
    }

    /// Counterparts that already have a private cursor
    pub fn counterparts(&self) -> impl Iterator<Item = &UserId> {
        self.private.keys()
    }

    /// Record a public message. The stored timestamp is `sent_at + 1` so the
    /// next fetch starts strictly after it.
    pub fn advance_public(&mut self, message: &ChatMessage) -> bool {
        self.public
            .advance(message.id.clone(), message.sent_at.next())
    }

    /// Whether a private `message` was already recorded for `counterpart`.
    ///
    /// Private cursors keep the raw `sent_at`, so a server that treats
    /// `lastTimestamp` inclusively returns the messages sitting on it again.
    /// Those are told apart by id.
    pub fn has_seen_private(&self, counterpart: &UserId, message: &ChatMessage) -> bool {
        let Some(cursor) = self.private.get(counterpart) else {
            return false;
        };
        if cursor.has_seen(message) {
            return true;
        }
        cursor.last_timestamp == Some(message.sent_at)
            && self
                .private_boundary
                .get(counterpart)
                .is_some_and(|ids| ids.contains(&message.id))
    }

    /// Record a private message for `counterpart` using the raw `sent_at`.
    ///
    /// An older timestamp, or an id already recorded at the current one, is refused.
    pub fn advance_private(&mut self, counterpart: &UserId, message: &ChatMessage) -> bool {
        let cursor = self.private.entry(counterpart.clone()).or_default();
        let boundary = self
            .private_boundary
            .entry(counterpart.clone())
            .or_default();

        match cursor.last_timestamp {
            Some(current) if message.sent_at < current => return false,
            Some(current) if message.sent_at == current => {
                if !boundary.insert(message.id.clone()) {
                    return false;
                }
            }
            _ => {
                boundary.clear();
                boundary.insert(message.id.clone());
            }
        }

        cursor.last_message_id = Some(message.id.clone());
        cursor.last_timestamp = Some(message.sent_at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_message(id: &str, sent_at: i64, sender: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(id),
            sent_at: Timestamp::new(sent_at),
            sender: Some(UserId::new(sender)),
            text: Some("hello".to_string()),
            is_private_message: false,
        }
    }

    #[test]
    fn test_public_cursor_tracks_last_message_plus_one() {
        // テスト項目: 公開カーソルが最後のメッセージの ID と sentAt + 1 を保持する
        // given (前提条件):
        let mut store = CursorStore::new();
        let batches = [
            vec![create_message("a", 100, "alice")],
            vec![
                create_message("b", 150, "bob"),
                create_message("c", 150, "alice"),
                create_message("d", 420, "carol"),
            ],
        ];

        for batch in &batches {
            // when (操作):
            for message in batch {
                store.advance_public(message);
            }

            // then (期待する結果):
            let last = batch.last().unwrap();
            assert_eq!(store.public().last_message_id, Some(last.id.clone()));
            assert_eq!(store.public().last_timestamp, Some(last.sent_at.next()));
        }
    }

    #[test]
    fn test_public_cursor_never_moves_backwards() {
        // テスト項目: 古いタイムスタンプのメッセージでは公開カーソルが後退しない
        // given (前提条件):
        let mut store = CursorStore::new();
        store.advance_public(&create_message("new", 500, "alice"));

        // when (操作):
        let advanced = store.advance_public(&create_message("old", 200, "bob"));

        // then (期待する結果):
        assert!(!advanced);
        assert_eq!(store.public().last_message_id, Some(MessageId::new("new")));
        assert_eq!(store.public().last_timestamp, Some(Timestamp::new(501)));
    }

    #[test]
    fn test_private_cursor_only_changes_for_its_counterpart() {
        // テスト項目: 個別メッセージは該当する相手のカーソルだけを更新する
        // given (前提条件):
        let mut store = CursorStore::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        store.advance_private(&bob, &create_message("b1", 50, "bob"));
        let bob_before = store.private(&bob).cloned();

        // when (操作):
        store.advance_private(&alice, &create_message("a1", 70, "alice"));
        store.advance_private(&alice, &create_message("a2", 80, "alice"));

        // then (期待する結果):
        assert_eq!(store.private(&bob).cloned(), bob_before);
        let alice_cursor = store.private(&alice).unwrap();
        assert_eq!(alice_cursor.last_message_id, Some(MessageId::new("a2")));
        assert_eq!(alice_cursor.last_timestamp, Some(Timestamp::new(80)));
        assert_eq!(store.public(), &MessageCursor::default());
    }

    #[test]
    fn test_private_cursor_created_lazily() {
        // テスト項目: 個別カーソルは最初のメッセージで初めて作成される
        // given (前提条件):
        let mut store = CursorStore::new();
        let alice = UserId::new("alice");
        assert!(store.private(&alice).is_none());

        // when (操作):
        store.advance_private(&alice, &create_message("a1", 70, "alice"));

        // then (期待する結果):
        assert!(store.private(&alice).is_some());
        assert_eq!(store.counterparts().count(), 1);
    }

    #[test]
    fn test_has_seen_by_id_or_older_timestamp() {
        // テスト項目: ID が一致するか、タイムスタンプがカーソルより古いメッセージは既読と判定される
        // given (前提条件):
        let mut store = CursorStore::new();
        store.advance_public(&create_message("a", 100, "alice"));
        let cursor = store.public().clone();

        // when (操作) / then (期待する結果):
        assert!(cursor.has_seen(&create_message("a", 100, "alice")));
        assert!(cursor.has_seen(&create_message("x", 99, "bob")));
        assert!(cursor.has_seen(&create_message("y", 100, "bob")));
        assert!(!cursor.has_seen(&create_message("z", 101, "bob")));
    }

    #[test]
    fn test_private_messages_sharing_a_timestamp_are_seen_once() {
        // テスト項目: 同じ sentAt の個別メッセージはそれぞれ 1 回だけ未読と判定され、カーソルは後退しない
        // given (前提条件):
        let mut store = CursorStore::new();
        let alice = UserId::new("alice");
        let batch = [
            create_message("p1", 10, "alice"),
            create_message("p2", 10, "alice"),
        ];
        for message in &batch {
            assert!(!store.has_seen_private(&alice, message));
            assert!(store.advance_private(&alice, message));
        }

        // when (操作):
        let seen: Vec<bool> = batch
            .iter()
            .map(|message| store.has_seen_private(&alice, message))
            .collect();
        let readvanced = store.advance_private(&alice, &batch[0]);

        // then (期待する結果):
        assert_eq!(seen, [true, true]);
        assert!(!readvanced);
        let cursor = store.private(&alice).unwrap();
        assert_eq!(cursor.last_message_id, Some(MessageId::new("p2")));
        assert_eq!(cursor.last_timestamp, Some(Timestamp::new(10)));
        assert!(!store.has_seen_private(&alice, &create_message("p3", 10, "alice")));
        assert!(!store.has_seen_private(&alice, &create_message("p4", 11, "alice")));
    }

    #[test]
    fn test_empty_cursor_has_seen_nothing() {
        // テスト項目: 空のカーソルはどのメッセージも既読と判定しない
        // given (前提条件):
        let cursor = MessageCursor::default();

        // when (操作):
        let seen = cursor.has_seen(&create_message("a", 0, "alice"));

        // then (期待する結果):
        assert!(!seen);
    }
}
