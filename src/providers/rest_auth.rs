//! Identity provider backed by the REST API.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::errors::AuthError;

use super::ProviderFuture;
use super::auth::{AuthProvider, SocialProvider, UserProfile};
use super::endpoint;
use super::session::SessionToken;

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// REST identity backend (`/auth/login/{provider}/`, `/auth/logout/`, `/auth/users/me/`).
pub struct RestAuthProvider {
    client: Client,
    base_url: String,
    token: SessionToken,
}

impl RestAuthProvider {
    /// Create a provider sharing `token` with the chat provider.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, token: SessionToken) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }

    fn login_url(&self, provider: SocialProvider) -> String {
        endpoint(&self.base_url, &format!("auth/login/{provider}/"))
    }

    fn logout_url(&self) -> String {
        endpoint(&self.base_url, "auth/logout/")
    }

    fn profile_url(&self) -> String {
        endpoint(&self.base_url, "auth/users/me/")
    }

    async fn fetch_profile(&self) -> Result<UserProfile, AuthError> {
        let authorization = self
            .token
            .authorization()
            .await
            .ok_or(AuthError::MissingToken)?;

        let response = self
            .client
            .get(self.profile_url())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        if is_auth_rejection(status) {
            self.token.clear().await;
            return Err(AuthError::SessionInvalid);
        }
        if !status.is_success() {
            return Err(AuthError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| AuthError::Malformed(e.to_string()))
    }

    async fn do_login(&self, provider: &str) -> Result<UserProfile, AuthError> {
        let provider: SocialProvider = provider.parse()?;

        let response = self
            .client
            .post(self.login_url(provider))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if is_auth_rejection(status) || status == StatusCode::BAD_REQUEST {
            return Err(AuthError::Rejected(error_message(&body, status)));
        }
        if !status.is_success() {
            return Err(AuthError::Status(status.as_u16()));
        }

        let login: LoginResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Malformed(e.to_string()))?;
        if login.token.trim().is_empty() {
            return Err(AuthError::Malformed("empty token".to_string()));
        }
        self.token.set(login.token).await;

        let profile = match login.user {
            Some(user) => user,
            None => {
                debug!("Login response carried no user, fetching profile");
                self.fetch_profile().await?
            }
        };
        info!("Logged in as {} via {provider}", profile.username);
        Ok(profile)
    }

    async fn do_logout(&self) {
        if let Some(authorization) = self.token.authorization().await {
            let result = self
                .client
                .post(self.logout_url())
                .header(reqwest::header::AUTHORIZATION, authorization)
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => debug!("Logged out"),
                Ok(response) => warn!("Logout failed: status {}", response.status()),
                Err(e) => warn!("Logout error: {e}"),
            }
        }
        self.token.clear().await;
    }
}

impl AuthProvider for RestAuthProvider {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn login(&self, provider: &str) -> ProviderFuture<'_, Result<UserProfile, AuthError>> {
        let provider = provider.to_string();
        Box::pin(async move { self.do_login(&provider).await })
    }

    fn logout(&self) -> ProviderFuture<'_, ()> {
        Box::pin(self.do_logout())
    }

    fn get_profile(&self) -> ProviderFuture<'_, Result<UserProfile, AuthError>> {
        Box::pin(self.fetch_profile())
    }
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Pull `error`/`message`/`detail` out of an error body, else the status text.
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message", "detail"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| status.to_string())
}
