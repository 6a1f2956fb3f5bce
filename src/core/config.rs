//! Configuration for the chat client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::ConfigError;

/// Environment variable for the REST backend base URL.
const API_URL_ENV: &str = "GALAXY_API_URL";
/// Environment variable selecting the auth backend (`rest` or `mock`).
const AUTH_BACKEND_ENV: &str = "GALAXY_AUTH_BACKEND";
/// Environment variable selecting the chat backend (`rest` or `generative`).
const CHAT_BACKEND_ENV: &str = "GALAXY_CHAT_BACKEND";
/// Environment variable for the generative-language base URL.
const GENAI_URL_ENV: &str = "GALAXY_GENAI_URL";
/// Environment variable for the generative-language model name.
const GENAI_MODEL_ENV: &str = "GALAXY_GENAI_MODEL";
/// Environment variable for the generative-language API key.
const GENAI_API_KEY_ENV: &str = "GALAXY_GENAI_API_KEY";
/// Environment variable for the `SQLite` file holding the durable slots.
const DB_PATH_ENV: &str = "GALAXY_DB_PATH";
/// Environment variable for the conversation slot name.
const STORAGE_SLOT_ENV: &str = "GALAXY_STORAGE_SLOT";
/// Environment variable for the HTTP request timeout.
const REQUEST_TIMEOUT_ENV: &str = "GALAXY_REQUEST_TIMEOUT_SECS";

/// Which identity backend to talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthBackend {
    /// REST API (`/auth/login/{provider}/`, `/auth/users/me/`).
    Rest,
    /// In-memory mock layer.
    Mock,
}

/// Which reply generator to talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatBackend {
    /// REST API (`/chat/message/`).
    Rest,
    /// Direct call to the generative-language endpoint.
    Generative,
}

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the REST backend, e.g. `http://localhost:8000/api`.
    pub api_base_url: String,
    /// Identity backend.
    pub auth_backend: AuthBackend,
    /// Reply backend.
    pub chat_backend: ChatBackend,
    /// Generative-language settings.
    pub generative: GenerativeConfig,
    /// Durable storage settings.
    pub storage: StorageConfig,
    /// Request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Extra attempts for retryable provider failures.
    pub max_retries: u32,
    /// Delay between retries in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            auth_backend: AuthBackend::Mock,
            chat_backend: ChatBackend::Rest,
            generative: GenerativeConfig::default(),
            storage: StorageConfig::default(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 1,
            retry_delay_ms: 500,
        }
    }
}

impl ChatConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `GALAXY_*` environment variables over the defaults.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unrecognised value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if a value is unrecognised or the result fails validation.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_ENV) {
            config.api_base_url = url;
        }
        if let Some(raw) = lookup(AUTH_BACKEND_ENV) {
            config.auth_backend = match raw.trim().to_ascii_lowercase().as_str() {
                "rest" => AuthBackend::Rest,
                "mock" => AuthBackend::Mock,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "{AUTH_BACKEND_ENV} must be rest or mock, got {other}"
                    )));
                }
            };
        }
        if let Some(raw) = lookup(CHAT_BACKEND_ENV) {
            config.chat_backend = match raw.trim().to_ascii_lowercase().as_str() {
                "rest" => ChatBackend::Rest,
                "generative" => ChatBackend::Generative,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "{CHAT_BACKEND_ENV} must be rest or generative, got {other}"
                    )));
                }
            };
        }
        if let Some(url) = lookup(GENAI_URL_ENV) {
            config.generative.base_url = url;
        }
        if let Some(model) = lookup(GENAI_MODEL_ENV) {
            config.generative.model = model;
        }
        config.generative.api_key = lookup(GENAI_API_KEY_ENV).filter(|k| !k.trim().is_empty());
        if let Some(path) = lookup(DB_PATH_ENV) {
            config.storage.sqlite_path = Some(PathBuf::from(path));
        }
        if let Some(slot) = lookup(STORAGE_SLOT_ENV) {
            config.storage.conversation_slot = slot;
        }
        if let Some(raw) = lookup(REQUEST_TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{REQUEST_TIMEOUT_ENV} must be an integer"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the REST backend URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the auth backend.
    #[must_use]
    pub const fn with_auth_backend(mut self, backend: AuthBackend) -> Self {
        self.auth_backend = backend;
        self
    }

    /// Set the chat backend.
    #[must_use]
    pub const fn with_chat_backend(mut self, backend: ChatBackend) -> Self {
        self.chat_backend = backend;
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api_base_url)?;
        Url::parse(&self.generative.base_url)?;

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be > 0".to_string(),
            ));
        }
        if self.storage.conversation_slot.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.conversation_slot must not be empty".to_string(),
            ));
        }
        if self.storage.conversation_slot == self.storage.token_slot {
            return Err(ConfigError::Invalid(
                "storage.conversation_slot and storage.token_slot must differ".to_string(),
            ));
        }
        if self.generative.model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "generative.model must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Generative-language endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerativeConfig {
    /// Base URL, without the `/v1beta/...` path.
    pub base_url: String,
    /// Model name, e.g. `gemini-1.5-flash`.
    pub model: String,
    /// API key; required when the generative backend is selected.
    pub api_key: Option<String>,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
        }
    }
}

/// Durable storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` file; `None` keeps everything in memory.
    pub sqlite_path: Option<PathBuf>,
    /// Slot holding the conversation snapshot.
    pub conversation_slot: String,
    /// Slot holding the session token.
    pub token_slot: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: None,
            conversation_slot: "userConversations".to_string(),
            token_slot: "token".to_string(),
        }
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
