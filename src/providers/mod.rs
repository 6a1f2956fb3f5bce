//! Identity and reply providers.
//!
//! Both sides share one [`SessionToken`] so a login through the identity
//! backend authenticates subsequent chat calls.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use crate::core::config::{AuthBackend, ChatBackend, ChatConfig};
use crate::core::errors::ProviderError;

pub mod auth;
pub mod chat;
pub mod generative;
pub mod mock_auth;
pub mod rest_auth;
pub mod rest_chat;
pub mod session;

pub use auth::{AuthProvider, ProfileDetails, SocialProvider, UserProfile};
pub use chat::{ChatProvider, ChatReply, SYSTEM_PROMPT};
pub use generative::GenerativeLanguageProvider;
pub use mock_auth::MockAuthProvider;
pub use rest_auth::RestAuthProvider;
pub use rest_chat::RestChatProvider;
pub use session::SessionToken;

/// Boxed future returned by provider traits.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Join `path` onto `base` with exactly one slash between them.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Build the shared HTTP client.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_http_client(config: &ChatConfig) -> Result<Client, ProviderError> {
    let client = Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(concat!("galaxy-chat/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Identity and reply providers wired to one session token.
#[derive(Clone)]
pub struct Providers {
    /// Identity backend.
    pub auth: Arc<dyn AuthProvider>,
    /// Reply backend.
    pub chat: Arc<dyn ChatProvider>,
    /// Token shared by both.
    pub token: SessionToken,
}

/// Instantiate the backends selected by `config`.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built or the generative
/// backend is selected without an API key.
pub fn build_providers(config: &ChatConfig) -> Result<Providers, ProviderError> {
    let client = build_http_client(config)?;
    let token = SessionToken::new();

    let auth: Arc<dyn AuthProvider> = match config.auth_backend {
        AuthBackend::Rest => Arc::new(RestAuthProvider::new(
            client.clone(),
            config.api_base_url.clone(),
            token.clone(),
        )),
        AuthBackend::Mock => Arc::new(MockAuthProvider::new(token.clone())),
    };

    let chat: Arc<dyn ChatProvider> = match config.chat_backend {
        ChatBackend::Rest => Arc::new(RestChatProvider::new(
            client,
            config.api_base_url.clone(),
            token.clone(),
        )),
        ChatBackend::Generative => Arc::new(GenerativeLanguageProvider::new(
            client,
            &config.generative,
        )?),
    };

    info!("Providers ready: auth={}, chat={}", auth.name(), chat.name());
    Ok(Providers { auth, chat, token })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        assert_eq!(endpoint("http://h/api", "chat/message/"), "http://h/api/chat/message/");
        assert_eq!(endpoint("http://h/api/", "/auth/logout/"), "http://h/api/auth/logout/");
    }

    #[test]
    fn test_build_default_providers() {
        let providers = build_providers(&ChatConfig::default()).unwrap();
        assert_eq!(providers.auth.name(), "mock");
        assert_eq!(providers.chat.name(), "rest");
    }

    #[test]
    fn test_generative_requires_key() {
        let config = ChatConfig::default().with_chat_backend(ChatBackend::Generative);
        assert!(matches!(
            build_providers(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
