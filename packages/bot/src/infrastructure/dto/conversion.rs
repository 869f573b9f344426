//! Conversion logic between DTOs and domain entities.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{ChatMessage, MessageId, RoomEvent, Timestamp, UserId};
use crate::infrastructure::dto::{chat as chat_dto, room_socket as socket_dto};

// ========================================
// DTO → Domain Entity
// ========================================

impl From<chat_dto::ChatMessageDto> for ChatMessage {
    fn from(dto: chat_dto::ChatMessageDto) -> Self {
        Self {
            id: MessageId::new(dto.id.into_string()),
            sent_at: Timestamp::new(dto.sent_at),
            sender: dto
                .sender
                .as_ref()
                .and_then(chat_dto::SenderRef::resolve)
                .map(UserId::new),
            text: dto.text,
            is_private_message: dto.is_private_message,
        }
    }
}

/// A decoded inbound room frame
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    /// Reply to an outbound request
    Ack {
        id: String,
        result: Result<Value, String>,
    },
    /// A notification for the event channel
    Event(RoomEvent),
}

/// Decode one text frame; the raw payload travels with the event
pub fn decode_room_frame(text: &str) -> Result<DecodedFrame, serde_json::Error> {
    let raw: Value = serde_json::from_str(text)?;
    let frame = socket_dto::InboundFrame::deserialize(&raw)?;

    let decoded = match frame {
        socket_dto::InboundFrame::Ack { id, state, error } => DecodedFrame::Ack {
            id,
            result: match error {
                Some(error) => Err(error),
                None => Ok(state.unwrap_or(Value::Null)),
            },
        },
        socket_dto::InboundFrame::StatefulEvent { name, state_patch } => {
            DecodedFrame::Event(RoomEvent::StateChanged {
                name,
                patch: state_patch,
                raw,
            })
        }
        socket_dto::InboundFrame::StatelessEvent { name } => {
            DecodedFrame::Event(RoomEvent::Stateless { name, raw })
        }
        socket_dto::InboundFrame::ServerMessage { message } => {
            DecodedFrame::Event(RoomEvent::ServerMessage {
                name: message.name,
                raw,
            })
        }
        socket_dto::InboundFrame::Error { error } => {
            DecodedFrame::Event(RoomEvent::SocketError(error))
        }
    };

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dto_chat_message_to_domain() {
        // テスト項目: DTO の ChatMessageDto がドメインエンティティに変換される
        // given (前提条件):
        let dto: chat_dto::ChatMessageDto = serde_json::from_value(json!({
            "id": "m1",
            "sentAt": 1000,
            "sender": {"_id": 77},
            "text": "!ping",
            "isPrivateMessage": true
        }))
        .unwrap();

        // when (操作):
        let message: ChatMessage = dto.into();

        // then (期待する結果):
        assert_eq!(message.id, MessageId::new("m1"));
        assert_eq!(message.sent_at, Timestamp::new(1000));
        assert_eq!(message.sender, Some(UserId::new("77")));
        assert_eq!(message.text.as_deref(), Some("!ping"));
        assert!(message.is_private_message);
    }

    #[test]
    fn test_decode_stateful_event_with_patch() {
        // テスト項目: statePatch 付きのイベントが StateChanged に変換される
        // given (前提条件):
        let text = r#"{"type":"stateful-event","name":"track-changed","statePatch":[{"op":"replace","path":"/x","value":5}]}"#;

        // when (操作):
        let decoded = decode_room_frame(text).unwrap();

        // then (期待する結果):
        let DecodedFrame::Event(RoomEvent::StateChanged { name, patch, raw }) = decoded else {
            panic!("expected state change");
        };
        assert_eq!(name, "track-changed");
        assert_eq!(
            patch,
            Some(json!([{"op": "replace", "path": "/x", "value": 5}]))
        );
        assert_eq!(raw["name"], json!("track-changed"));
    }

    #[test]
    fn test_decode_stateful_event_without_patch() {
        // テスト項目: statePatch の無いイベントは patch が None になる
        // given (前提条件):
        let text = r#"{"type":"stateful-event","name":"noop"}"#;

        // when (操作):
        let decoded = decode_room_frame(text).unwrap();

        // then (期待する結果):
        assert!(matches!(
            decoded,
            DecodedFrame::Event(RoomEvent::StateChanged { patch: None, .. })
        ));
    }

    #[test]
    fn test_decode_stateful_event_with_malformed_patch() {
        // テスト項目: 不正な操作を含む statePatch でもフレームは破棄されずイベントとして届く
        // given (前提条件):
        let text = r#"{"type":"stateful-event","name":"broken","statePatch":[{"op":"shuffle","path":"/x"},{"op":"add","path":"/y"}]}"#;

        // when (操作):
        let decoded = decode_room_frame(text).unwrap();

        // then (期待する結果):
        let DecodedFrame::Event(RoomEvent::StateChanged { name, patch, raw }) = decoded else {
            panic!("expected state change");
        };
        assert_eq!(name, "broken");
        assert_eq!(patch.as_ref().and_then(Value::as_array).map(Vec::len), Some(2));
        assert_eq!(raw["statePatch"][0]["op"], json!("shuffle"));
    }

    #[test]
    fn test_decode_other_event_kinds() {
        // テスト項目: stateless / server-message / error フレームがそれぞれ変換される
        // given (前提条件):
        let stateless = r#"{"type":"stateless-event","name":"chat-reaction","emoji":"+1"}"#;
        let server = r#"{"type":"server-message","message":{"name":"kick","reason":"idle"}}"#;
        let error = r#"{"type":"error","error":"bad token"}"#;

        // when (操作):
        let stateless = decode_room_frame(stateless).unwrap();
        let server = decode_room_frame(server).unwrap();
        let error = decode_room_frame(error).unwrap();

        // then (期待する結果):
        assert!(matches!(
            stateless,
            DecodedFrame::Event(RoomEvent::Stateless { ref name, .. }) if name == "chat-reaction"
        ));
        assert!(matches!(
            server,
            DecodedFrame::Event(RoomEvent::ServerMessage { ref name, .. }) if name == "kick"
        ));
        assert_eq!(
            error,
            DecodedFrame::Event(RoomEvent::SocketError(json!("bad token")))
        );
    }

    #[test]
    fn test_decode_ack_frames() {
        // テスト項目: ack フレームは成功時に状態、失敗時にエラー文字列を返す
        // given (前提条件):
        let ok = r#"{"type":"ack","id":"r1","state":{"a":1}}"#;
        let rejected = r#"{"type":"ack","id":"r2","error":"room not found"}"#;

        // when (操作):
        let ok = decode_room_frame(ok).unwrap();
        let rejected = decode_room_frame(rejected).unwrap();

        // then (期待する結果):
        assert_eq!(
            ok,
            DecodedFrame::Ack {
                id: "r1".to_string(),
                result: Ok(json!({"a": 1}))
            }
        );
        assert_eq!(
            rejected,
            DecodedFrame::Ack {
                id: "r2".to_string(),
                result: Err("room not found".to_string())
            }
        );
    }

    #[test]
    fn test_decode_unknown_frame_fails() {
        // テスト項目: 未知の type のフレームはデコードエラーになる
        // given (前提条件):
        let text = r#"{"type":"mystery"}"#;

        // when (操作):
        let result = decode_room_frame(text);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
