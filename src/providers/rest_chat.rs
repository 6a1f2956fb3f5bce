//! Chat provider backed by the REST API.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::errors::ProviderError;

use super::ProviderFuture;
use super::chat::{ChatProvider, ChatReply};
use super::endpoint;
use super::session::SessionToken;

#[derive(Serialize)]
struct ChatMessageRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    message: Option<String>,
}

/// REST chat backend (`POST /chat/message/`).
pub struct RestChatProvider {
    client: Client,
    base_url: String,
    token: SessionToken,
}

impl RestChatProvider {
    /// Create a provider sharing `token` with the identity provider.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, token: SessionToken) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }

    fn message_url(&self) -> String {
        endpoint(&self.base_url, "chat/message/")
    }

    async fn post_message(
        &self,
        text: &str,
        authenticated: bool,
    ) -> Result<ChatReply, ProviderError> {
        let mut request = self
            .client
            .post(self.message_url())
            .json(&ChatMessageRequest { message: text });

        if authenticated {
            if let Some(authorization) = self.token.authorization().await {
                request = request.header(reqwest::header::AUTHORIZATION, authorization);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("Chat backend rejected the session token, clearing it");
            self.token.clear().await;
            return Err(ProviderError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let reply = parse_chat_reply(&body)?;
        debug!(chars = reply.message.len(), "chat reply received");
        Ok(reply)
    }
}

impl ChatProvider for RestChatProvider {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn send_message(
        &self,
        text: &str,
        authenticated: bool,
    ) -> ProviderFuture<'_, Result<ChatReply, ProviderError>> {
        let text = text.to_string();
        Box::pin(async move { self.post_message(&text, authenticated).await })
    }
}

/// Decode a `/chat/message/` response body.
///
/// # Errors
/// Returns [`ProviderError::Malformed`] for invalid JSON and
/// [`ProviderError::EmptyReply`] when `message` is missing or blank.
pub fn parse_chat_reply(body: &str) -> Result<ChatReply, ProviderError> {
    let response: ChatMessageResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    match response.message {
        Some(message) if !message.trim().is_empty() => Ok(ChatReply { message }),
        _ => Err(ProviderError::EmptyReply),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_parse_reply() {
        let reply = parse_chat_reply(r#"{"message":"Hi there","conversation_id":4}"#).unwrap();
        assert_eq!(reply.message, "Hi there");
    }

    #[test]
    fn test_parse_empty_reply() {
        assert!(matches!(
            parse_chat_reply(r#"{"message":"   "}"#),
            Err(ProviderError::EmptyReply)
        ));
        assert!(matches!(
            parse_chat_reply("{}"),
            Err(ProviderError::EmptyReply)
        ));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_chat_reply("<html>502</html>"),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn test_message_url() {
        let provider = RestChatProvider::new(
            Client::new(),
            "http://localhost:8000/api",
            SessionToken::new(),
        );
        assert_eq!(
            provider.message_url(),
            "http://localhost:8000/api/chat/message/"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let provider = RestChatProvider::new(client, "http://127.0.0.1:1/api", SessionToken::new());
        let result = provider.send_message("Hello", false).await;
        assert!(matches!(result, Err(ProviderError::Http(_))));
    }
}
