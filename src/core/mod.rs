//! Core types: identifiers, errors, configuration.

pub mod config;
pub mod errors;
pub mod ids;

pub use config::{AuthBackend, ChatBackend, ChatConfig, GenerativeConfig, StorageConfig};
pub use errors::{
    AuthError, ConfigError, ProviderError, StorageError, StorageResult, StoreError, StoreResult,
};
pub use ids::{ConversationId, MessageId, MessageIdGenerator};
