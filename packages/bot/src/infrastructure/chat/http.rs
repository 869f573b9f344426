//! `ChatService` over the group-chat HTTP API.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use serde::Serialize;

use crate::{
    domain::{
        ChatMessage, ChatService, ChatServiceError, PrivateFetchQuery, PublicFetchQuery, UserId,
    },
    infrastructure::dto::chat::{ChatMessageDto, SendMessageBody},
};

/// HTTP client for the group-chat service
///
/// Every request carries the pre-issued token as a bearer credential.
#[derive(Debug, Clone)]
pub struct HttpChatService {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpChatService {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ChatServiceError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ChatServiceError::Transport(format!("invalid chat URL '{base_url}': {e}"))
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            token: token.into(),
        })
    }

    /// Append path segments to the base URL, escaping each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ChatServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ChatServiceError::Transport(format!("chat URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_checked(&self, request: RequestBuilder) -> Result<Response, ChatServiceError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ChatServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn fetch<Q: Serialize + Sync>(
        &self,
        url: Url,
        query: &Q,
    ) -> Result<Vec<ChatMessage>, ChatServiceError> {
        let response = self.send_checked(self.client.get(url).query(query)).await?;
        let records: Vec<ChatMessageDto> = response
            .json()
            .await
            .map_err(|e| ChatServiceError::Decode(e.to_string()))?;
        Ok(records.into_iter().map(ChatMessage::from).collect())
    }

    async fn post_text(&self, url: Url, text: &str) -> Result<(), ChatServiceError> {
        let body = SendMessageBody {
            text: text.to_string(),
        };
        self.send_checked(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn join(&self, room_id: &str) -> Result<(), ChatServiceError> {
        let url = self.endpoint(&["rooms", room_id, "join"])?;
        self.send_checked(self.client.post(url)).await?;
        tracing::debug!(room_id, "Joined chat room");
        Ok(())
    }

    async fn fetch_messages(
        &self,
        room_id: &str,
        query: &PublicFetchQuery,
    ) -> Result<Vec<ChatMessage>, ChatServiceError> {
        let url = self.endpoint(&["rooms", room_id, "messages"])?;
        self.fetch(url, query).await
    }

    async fn fetch_private_messages(
        &self,
        counterpart: &UserId,
        query: &PrivateFetchQuery,
    ) -> Result<Vec<ChatMessage>, ChatServiceError> {
        let url = self.endpoint(&["users", counterpart.as_str(), "messages"])?;
        self.fetch(url, query).await
    }

    async fn send_message(&self, room_id: &str, text: &str) -> Result<(), ChatServiceError> {
        let url = self.endpoint(&["rooms", room_id, "messages"])?;
        self.post_text(url, text).await
    }

    async fn send_private_message(
        &self,
        counterpart: &UserId,
        text: &str,
    ) -> Result<(), ChatServiceError> {
        let url = self.endpoint(&["users", counterpart.as_str(), "messages"])?;
        self.post_text(url, text).await
    }
}
