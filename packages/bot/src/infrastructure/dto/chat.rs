//! Group-chat HTTP API DTOs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier that may arrive as a string or a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Object fields that may carry a sender identifier, in lookup order
const SENDER_ID_FIELDS: [&str; 3] = ["id", "_id", "userId"];

/// Sender as sent by the service: a bare id or an object holding one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SenderRef {
    Id(WireId),
    Object(Map<String, Value>),
}

impl SenderRef {
    /// Plain identifier of the sender, if one can be found
    pub fn resolve(&self) -> Option<String> {
        let id = match self {
            Self::Id(id) => id.clone().into_string(),
            Self::Object(fields) => SENDER_ID_FIELDS
                .iter()
                .filter_map(|field| fields.get(*field))
                .find_map(|value| match value {
                    Value::String(text) => Some(text.clone()),
                    Value::Number(number) => Some(number.to_string()),
                    _ => None,
                })?,
        };
        let id = id.trim();
        (!id.is_empty()).then(|| id.to_string())
    }
}

/// A message record returned by the fetch endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: WireId,
    pub sent_at: i64,
    #[serde(default)]
    pub sender: Option<SenderRef>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_private_message: bool,
}

/// Body of the send endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageBody {
    pub text: String,
}
