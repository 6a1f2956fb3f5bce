//! Reply generator abstraction.

use serde::{Deserialize, Serialize};

use crate::core::errors::ProviderError;

use super::ProviderFuture;

/// Persona given to backends that accept a system instruction.
pub const SYSTEM_PROMPT: &str = "You are Galaxy AI, a helpful and friendly AI assistant. \
You provide concise, accurate information and assist users with their questions and tasks.";

/// Generated reply.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Reply text.
    pub message: String,
}

/// Trait for reply generators.
pub trait ChatProvider: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Generate a reply to `text`.
    ///
    /// `authenticated` tells the provider whether to attach the session token.
    ///
    /// # Errors
    /// Returns an error on network failure, non-2xx status, malformed payload
    /// or an empty generated text.
    fn send_message(
        &self,
        text: &str,
        authenticated: bool,
    ) -> ProviderFuture<'_, Result<ChatReply, ProviderError>>;
}
