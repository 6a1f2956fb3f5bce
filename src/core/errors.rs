//! Error taxonomy for the chat client.
//!
//! Only [`StoreError`] is meant to reach callers of the conversation store.
//! Provider and storage failures are caught at the session boundary and
//! turned into a fallback reply or an empty state.

use thiserror::Error;

use crate::core::ids::ConversationId;

/// Errors returned by conversation store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The referenced conversation does not exist.
    #[error("conversation not found: {0}")]
    ConversationNotFound(ConversationId),
    /// A conversation with this id already exists.
    #[error("conversation already exists: {0}")]
    DuplicateConversation(ConversationId),
}

impl StoreError {
    /// Whether the caller can recover by falling back to a fresh conversation.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ConversationNotFound(_))
    }
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by identity providers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The requested social provider is not supported.
    #[error("unsupported login provider: {0}")]
    UnsupportedProvider(String),
    /// No session token is held.
    #[error("no authentication token found")]
    MissingToken,
    /// The backend rejected the session token.
    #[error("session is invalid or expired")]
    SessionInvalid,
    /// The backend refused the credentials.
    #[error("login rejected: {0}")]
    Rejected(String),
    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Unexpected status code.
    #[error("unexpected status {0}")]
    Status(u16),
    /// Response body could not be decoded.
    #[error("malformed auth response: {0}")]
    Malformed(String),
}

/// Errors raised by chat providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider answered with a non-2xx status.
    #[error("provider returned status {0}")]
    Status(u16),
    /// Provider rejected the session token.
    #[error("provider rejected the session token")]
    Unauthorized,
    /// Payload did not have the expected shape.
    #[error("malformed provider payload: {0}")]
    Malformed(String),
    /// Provider answered without any generated text.
    #[error("provider returned an empty reply")]
    EmptyReply,
    /// Provider is missing configuration (API key, URL).
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Check if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status(code) => *code >= 500 || *code == 429,
            _ => false,
        }
    }
}

/// Errors raised by the durable slot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Snapshot decoded but violates a store invariant.
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
    /// Snapshot was written by an unknown format version.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// Convenience result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_recoverable() {
        let err = StoreError::ConversationNotFound(ConversationId::new());
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("conversation not found"));

        let err = StoreError::DuplicateConversation(ConversationId::new());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_provider_retryable() {
        assert!(ProviderError::Status(503).is_retryable());
        assert!(ProviderError::Status(429).is_retryable());
        assert!(!ProviderError::Status(400).is_retryable());
        assert!(!ProviderError::EmptyReply.is_retryable());
    }
}
