//! Authenticated chat session.
//!
//! Wires the conversation store to the identity and reply providers. The
//! store sits behind one async mutex; the reply request runs without it so
//! several messages can be in flight at once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::conversations::{ConversationStore, ReplyOutcome, RestoreOutcome, SendReceipt};
use crate::core::config::ChatConfig;
use crate::core::errors::{AuthError, ProviderError, StoreResult};
use crate::core::ids::{ConversationId, MessageId};
use crate::providers::{AuthProvider, ChatProvider, ChatReply, Providers, SessionToken, UserProfile};
use crate::storage::SlotStorage;

/// Retry settings for retryable provider failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy described by `config`.
    #[must_use]
    pub const fn from_config(config: &ChatConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// One completed send: the user message and the reply that resolved it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchange {
    /// Ids created by the send.
    pub receipt: SendReceipt,
    /// What the provider produced.
    pub reply: ReplyOutcome,
    /// Id of the appended reply; `None` if the conversation went away meanwhile.
    pub reply_id: Option<MessageId>,
}

/// Conversation store plus identity, reply and storage backends.
pub struct ChatSession {
    store: Mutex<ConversationStore>,
    auth: Arc<dyn AuthProvider>,
    chat: Arc<dyn ChatProvider>,
    token: SessionToken,
    storage: Arc<dyn SlotStorage>,
    token_slot: String,
    user: RwLock<Option<UserProfile>>,
    retry: RetryPolicy,
}

impl ChatSession {
    /// Create a signed-out session with an empty store.
    #[must_use]
    pub fn new(storage: Arc<dyn SlotStorage>, providers: Providers, config: &ChatConfig) -> Self {
        let store = ConversationStore::new(
            Arc::clone(&storage),
            config.storage.conversation_slot.clone(),
        );
        Self {
            store: Mutex::new(store),
            auth: providers.auth,
            chat: providers.chat,
            token: providers.token,
            storage,
            token_slot: config.storage.token_slot.clone(),
            user: RwLock::new(None),
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Signed-in user, if any.
    pub async fn user(&self) -> Option<UserProfile> {
        self.user.read().await.clone()
    }

    /// Whether a user is signed in.
    pub async fn is_authenticated(&self) -> bool {
        self.user.read().await.is_some()
    }

    /// Run `f` against the current store contents.
    pub async fn view<R>(&self, f: impl FnOnce(&ConversationStore) -> R) -> R {
        let store = self.store.lock().await;
        f(&store)
    }

    /// Resume a previous session from the persisted token.
    ///
    /// A token the identity backend no longer accepts is removed from memory
    /// and storage; the session then stays signed out.
    pub async fn bootstrap(&self) -> Option<UserProfile> {
        let stored = match self.storage.read(&self.token_slot).await {
            Ok(stored) => stored.filter(|token| !token.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read token slot: {e}");
                None
            }
        };
        let Some(token) = stored else {
            debug!("No stored session token");
            return None;
        };

        self.token.set(token).await;
        match self.auth.get_profile().await {
            Ok(profile) => {
                info!("Resumed session for {}", profile.username);
                *self.user.write().await = Some(profile.clone());
                self.restore_conversations().await;
                Some(profile)
            }
            Err(e) => {
                warn!("Stored session rejected: {e}");
                self.forget_token().await;
                None
            }
        }
    }

    /// Sign in with a social provider, persist the token and load history.
    ///
    /// # Errors
    /// Returns an error if the provider is unsupported or the backend refuses.
    pub async fn login(&self, provider: &str) -> Result<UserProfile, AuthError> {
        let profile = self.auth.login(provider).await?;

        match self.token.get().await {
            Some(token) => {
                if let Err(e) = self.storage.write(&self.token_slot, token).await {
                    warn!("Failed to persist session token: {e}");
                }
            }
            None => warn!("Login succeeded without a session token"),
        }

        *self.user.write().await = Some(profile.clone());
        self.restore_conversations().await;
        Ok(profile)
    }

    /// Sign out. In-memory conversations are dropped; the persisted snapshot stays.
    pub async fn logout(&self) {
        self.auth.logout().await;
        self.forget_token().await;
        self.store.lock().await.clear();
        info!("Signed out");
    }

    /// Start an empty conversation and make it active.
    pub async fn start_conversation(&self) -> ConversationId {
        let mut store = self.store.lock().await;
        let id = store.start_conversation();
        self.persist(&store).await;
        id
    }

    /// Activate `id`, or start a new conversation if it no longer exists.
    ///
    /// Returns the id that ends up active.
    pub async fn select_conversation(&self, id: ConversationId) -> ConversationId {
        let mut store = self.store.lock().await;
        let selected = match store.select_conversation(id) {
            Ok(()) => id,
            Err(e) => {
                warn!("{e}, starting a new conversation");
                store.start_conversation()
            }
        };
        self.persist(&store).await;
        selected
    }

    /// Rename a conversation; returns whether the title changed.
    ///
    /// # Errors
    /// Returns an error if `id` does not exist.
    pub async fn rename_conversation(&self, id: ConversationId, title: &str) -> StoreResult<bool> {
        let mut store = self.store.lock().await;
        let changed = store.rename_conversation(id, title)?;
        if changed {
            self.persist(&store).await;
        }
        Ok(changed)
    }

    /// Delete a conversation; returns the new active id.
    ///
    /// # Errors
    /// Returns an error if `id` does not exist.
    pub async fn delete_conversation(&self, id: ConversationId) -> StoreResult<Option<ConversationId>> {
        let mut store = self.store.lock().await;
        let active = store.delete_conversation(id)?;
        self.persist(&store).await;
        Ok(active)
    }

    /// Send a user message and wait for its reply.
    ///
    /// Returns `None` for blank input. Provider failures resolve with the
    /// fallback reply instead of an error.
    pub async fn send_message(&self, text: &str) -> Option<Exchange> {
        let receipt = {
            let mut store = self.store.lock().await;
            let receipt = store.send_user_message(text)?;
            self.persist(&store).await;
            receipt
        };

        let authenticated = self.is_authenticated().await;
        let reply = match self.request_reply(text.trim(), authenticated).await {
            Ok(reply) => ReplyOutcome::Success(reply.message),
            Err(e) => {
                warn!("Reply failed via {}: {e}", self.chat.name());
                if matches!(e, ProviderError::Unauthorized) {
                    self.forget_token().await;
                }
                ReplyOutcome::Failure
            }
        };

        let reply_id = {
            let mut store = self.store.lock().await;
            let reply_id =
                store.resolve_typing(receipt.conversation_id, receipt.placeholder_id, &reply);
            if reply_id.is_some() {
                self.persist(&store).await;
            } else {
                debug!(placeholder = %receipt.placeholder_id, "reply arrived for a removed placeholder");
            }
            reply_id
        };

        Some(Exchange {
            receipt,
            reply,
            reply_id,
        })
    }

    async fn request_reply(
        &self,
        text: &str,
        authenticated: bool,
    ) -> Result<ChatReply, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.chat.send_message(text, authenticated).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        "Reply attempt {attempt}/{} failed: {e}",
                        self.retry.max_retries + 1
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn restore_conversations(&self) {
        let mut store = self.store.lock().await;
        let outcome = store.restore().await;
        let discarded = store.discard_pending();
        if discarded > 0 {
            debug!(discarded, "dropped stale typing placeholders");
        }
        let kept_local = match outcome {
            RestoreOutcome::Restored { conversations } => {
                info!("Loaded {conversations} conversation(s)");
                false
            }
            RestoreOutcome::Empty | RestoreOutcome::Discarded => !store.is_empty(),
        };
        // Conversations started while signed out become the saved history.
        if discarded > 0 || kept_local {
            self.persist(&store).await;
        }
    }

    async fn forget_token(&self) {
        self.token.clear().await;
        if let Err(e) = self.storage.remove(&self.token_slot).await {
            warn!("Failed to remove session token: {e}");
        }
        *self.user.write().await = None;
    }

    /// Last write wins; failures are logged.
    async fn persist(&self, store: &ConversationStore) {
        if !self.is_authenticated().await {
            return;
        }
        if let Err(e) = store.persist().await {
            warn!("Failed to persist conversations: {e}");
        }
    }
}
