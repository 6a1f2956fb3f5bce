//! Identity provider abstraction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::AuthError;

use super::ProviderFuture;

/// Social login providers the backend accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialProvider {
    /// Google sign-in.
    Google,
    /// Facebook login.
    Facebook,
}

impl SocialProvider {
    /// Path segment used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SocialProvider {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            other => Err(AuthError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Extra profile fields.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProfileDetails {
    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Authenticated user as returned by the identity backend.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend user id.
    pub id: u64,
    /// Login name.
    pub username: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Avatar and other extras.
    #[serde(default)]
    pub profile: ProfileDetails,
}

impl UserProfile {
    /// Full name when known, else the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Trait for identity backends.
pub trait AuthProvider: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Log in with a social provider; stores the session token on success.
    ///
    /// # Errors
    /// Returns an error for unsupported providers, rejected credentials or
    /// network failures.
    fn login(&self, provider: &str) -> ProviderFuture<'_, Result<UserProfile, AuthError>>;

    /// End the session. Best effort: the local token is always cleared.
    fn logout(&self) -> ProviderFuture<'_, ()>;

    /// Fetch the profile for the held token.
    ///
    /// # Errors
    /// Returns [`AuthError::MissingToken`] without a token and
    /// [`AuthError::SessionInvalid`] when the backend rejects it.
    fn get_profile(&self) -> ProviderFuture<'_, Result<UserProfile, AuthError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(
            "Google".parse::<SocialProvider>().unwrap(),
            SocialProvider::Google
        );
        assert_eq!(
            " facebook ".parse::<SocialProvider>().unwrap(),
            SocialProvider::Facebook
        );
        assert!(matches!(
            "myspace".parse::<SocialProvider>(),
            Err(AuthError::UnsupportedProvider(p)) if p == "myspace"
        ));
    }

    #[test]
    fn test_profile_defaults() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id":1,"username":"testuser"}"#).unwrap();
        assert_eq!(profile.display_name(), "testuser");
        assert!(profile.profile.avatar.is_none());
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"id":1,"username":"testuser","first_name":"Test","last_name":"User"}"#,
        )
        .unwrap();
        assert_eq!(profile.display_name(), "Test User");
    }
}
