//! Direct client for the generative-language `generateContent` endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::GenerativeConfig;
use crate::core::errors::ProviderError;

use super::ProviderFuture;
use super::chat::{ChatProvider, ChatReply, SYSTEM_PROMPT};

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

/// Generative-language chat backend.
///
/// Stateless: each message is sent on its own, the session token is never
/// attached.
pub struct GenerativeLanguageProvider {
    client: Client,
    url: String,
    api_key: String,
}

impl GenerativeLanguageProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    /// Returns [`ProviderError::NotConfigured`] when no API key is set.
    pub fn new(client: Client, config: &GenerativeConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("generative.api_key".to_string()))?;
        Ok(Self {
            client,
            url: generate_url(&config.base_url, &config.model),
            api_key,
        })
    }

    async fn generate(&self, text: &str) -> Result<ChatReply, ProviderError> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_PROMPT,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text }],
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let reply = parse_generate_response(&body)?;
        debug!(chars = reply.message.len(), "generated reply received");
        Ok(reply)
    }
}

impl ChatProvider for GenerativeLanguageProvider {
    fn name(&self) -> &'static str {
        "generative"
    }

    fn send_message(
        &self,
        text: &str,
        _authenticated: bool,
    ) -> ProviderFuture<'_, Result<ChatReply, ProviderError>> {
        let text = text.to_string();
        Box::pin(async move { self.generate(&text).await })
    }
}

/// `{base}/v1beta/models/{model}:generateContent`.
#[must_use]
pub fn generate_url(base_url: &str, model: &str) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model.trim()
    )
}

/// Extract the reply text from a `generateContent` response body.
///
/// Text parts of the first candidate are concatenated.
///
/// # Errors
/// Returns [`ProviderError::Malformed`] for invalid JSON or a blocked prompt,
/// and [`ProviderError::EmptyReply`] when no text was generated.
pub fn parse_generate_response(body: &str) -> Result<ChatReply, ProviderError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(ProviderError::Malformed(format!("prompt blocked: {reason}")));
    }

    let message: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if message.trim().is_empty() {
        return Err(ProviderError::EmptyReply);
    }
    Ok(ChatReply { message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url() {
        assert_eq!(
            generate_url("https://generativelanguage.googleapis.com/", "gemini-1.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_parse_joins_parts() {
        let body = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        assert_eq!(parse_generate_response(body).unwrap().message, "Hi there");
    }

    #[test]
    fn test_parse_no_candidates_is_empty_reply() {
        assert!(matches!(
            parse_generate_response(r#"{"candidates": []}"#),
            Err(ProviderError::EmptyReply)
        ));
        assert!(matches!(
            parse_generate_response(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#),
            Err(ProviderError::EmptyReply)
        ));
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert!(matches!(
            parse_generate_response(body),
            Err(ProviderError::Malformed(reason)) if reason.contains("SAFETY")
        ));
    }

    #[test]
    fn test_missing_api_key_is_not_configured() {
        let config = GenerativeConfig::default();
        assert!(matches!(
            GenerativeLanguageProvider::new(Client::new(), &config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: "sys" }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: "Hello" }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(json["contents"][0]["role"], "user");
        assert!(json["systemInstruction"].get("role").is_none());
    }
}
