//! In-memory identity provider.
//!
//! Stands in for the social login backend: any supported provider succeeds
//! and yields a demo profile. Tokens are only valid for the instance that
//! issued them.

use dashmap::DashMap;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::info;

use crate::core::errors::AuthError;

use super::ProviderFuture;
use super::auth::{AuthProvider, ProfileDetails, SocialProvider, UserProfile};
use super::session::SessionToken;

/// Length of issued tokens, matching the REST backend's keys.
const TOKEN_LEN: usize = 40;

/// Mock identity backend.
pub struct MockAuthProvider {
    token: SessionToken,
    issued: DashMap<String, UserProfile>,
}

impl MockAuthProvider {
    /// Create a mock provider sharing `token`.
    #[must_use]
    pub fn new(token: SessionToken) -> Self {
        Self {
            token,
            issued: DashMap::new(),
        }
    }

    /// Profile handed out for `provider`.
    #[must_use]
    pub fn demo_profile(provider: SocialProvider) -> UserProfile {
        UserProfile {
            id: 1,
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            profile: ProfileDetails {
                avatar: Some(format!("https://avatars.example.com/{provider}/testuser.png")),
            },
        }
    }

    fn issue_token() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect()
    }

    async fn do_login(&self, provider: &str) -> Result<UserProfile, AuthError> {
        let provider: SocialProvider = provider.parse()?;
        let profile = Self::demo_profile(provider);
        let token = Self::issue_token();
        self.issued.insert(token.clone(), profile.clone());
        self.token.set(token).await;
        info!("Mock login as {} via {provider}", profile.username);
        Ok(profile)
    }

    async fn do_logout(&self) {
        if let Some(token) = self.token.get().await {
            self.issued.remove(&token);
        }
        self.token.clear().await;
    }

    async fn do_get_profile(&self) -> Result<UserProfile, AuthError> {
        let token = self.token.get().await.ok_or(AuthError::MissingToken)?;
        let profile = self.issued.get(&token).map(|entry| entry.value().clone());
        match profile {
            Some(profile) => Ok(profile),
            None => {
                self.token.clear().await;
                Err(AuthError::SessionInvalid)
            }
        }
    }
}

impl AuthProvider for MockAuthProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn login(&self, provider: &str) -> ProviderFuture<'_, Result<UserProfile, AuthError>> {
        let provider = provider.to_string();
        Box::pin(async move { self.do_login(&provider).await })
    }

    fn logout(&self) -> ProviderFuture<'_, ()> {
        Box::pin(self.do_logout())
    }

    fn get_profile(&self) -> ProviderFuture<'_, Result<UserProfile, AuthError>> {
        Box::pin(self.do_get_profile())
    }
}
