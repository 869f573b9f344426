//! Value objects shared across the domain.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a chat user (the bot itself or a counterpart)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a chat message as assigned by the chat service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The timestamp one millisecond later
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_next_advances_by_one_millisecond() {
        // テスト項目: next() が 1 ミリ秒後のタイムスタンプを返す
        // given (前提条件):
        let timestamp = Timestamp::new(1000);

        // when (操作):
        let next = timestamp.next();

        // then (期待する結果):
        assert_eq!(next, Timestamp::new(1001));
        assert!(next > timestamp);
    }

    #[test]
    fn test_timestamp_next_saturates() {
        // テスト項目: 最大値で next() を呼んでもオーバーフローしない
        // given (前提条件):
        let timestamp = Timestamp::new(i64::MAX);

        // when (操作):
        let next = timestamp.next();

        // then (期待する結果):
        assert_eq!(next.value(), i64::MAX);
    }

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        // テスト項目: UserId が素の文字列としてシリアライズされる
        // given (前提条件):
        let user_id = UserId::new("alice");

        // when (操作):
        let json = serde_json::to_string(&user_id).unwrap();

        // then (期待する結果):
        assert_eq!(json, "\"alice\"");
    }
}
