//! Session token shared by the identity and chat providers.

use std::sync::Arc;

use tokio::sync::RwLock;

/// Header scheme used by the REST backend (`Authorization: Token <key>`).
pub const TOKEN_SCHEME: &str = "Token";

/// Opaque session token held for the lifetime of an authenticated session.
///
/// Cloning shares the same cell.
#[derive(Clone, Debug, Default)]
pub struct SessionToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl SessionToken {
    /// Create an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, if any.
    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    /// Whether a token is held.
    pub async fn is_present(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Store a token.
    pub async fn set(&self, token: impl Into<String>) {
        let mut guard = self.inner.write().await;
        *guard = Some(token.into());
    }

    /// Drop the token.
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }

    /// `Authorization` header value for the current token.
    pub async fn authorization(&self) -> Option<String> {
        self.get()
            .await
            .map(|token| format!("{TOKEN_SCHEME} {token}"))
    }
}
