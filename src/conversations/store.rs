//! Conversation store: single source of truth for conversation state.
//!
//! Every mutation is one [`ConversationAction`] transition, dispatched by
//! [`ConversationStore::apply`] or by the named shorthands. The invariants
//! below hold after each transition:
//! - the active id, when set, names an existing conversation;
//! - a title set from the first user message is only replaced by a rename;
//! - a conversation shows at most one typing placeholder;
//! - message ids increase strictly within a conversation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::core::errors::{StorageResult, StoreError, StoreResult};
use crate::core::ids::{ConversationId, MessageId};
use crate::storage::SlotStorage;

use super::snapshot::{self, StoreState};
use super::types::{Conversation, Message, PendingReply, ReplyOutcome, SendReceipt};

/// A state transition request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversationAction {
    /// Create an empty conversation and make it active.
    Start {
        /// Id of the new conversation.
        id: ConversationId,
        /// Creation time.
        at: DateTime<Utc>,
    },
    /// Make an existing conversation active.
    Select(ConversationId),
    /// Append a user message and a typing placeholder to the active conversation.
    SendUser {
        /// Raw user input.
        text: String,
        /// Used if a conversation has to be created.
        at: DateTime<Utc>,
    },
    /// Replace a placeholder with the provider's reply.
    ResolveTyping {
        /// Conversation the placeholder was created in.
        conversation_id: ConversationId,
        /// Placeholder id returned by the send.
        placeholder_id: MessageId,
        /// Provider result.
        outcome: ReplyOutcome,
    },
    /// Change a conversation title.
    Rename {
        /// Conversation to rename.
        id: ConversationId,
        /// New title, trimmed before use.
        title: String,
    },
    /// Remove a conversation.
    Delete(ConversationId),
    /// Drop every placeholder and outstanding ticket.
    DiscardPending,
}

/// What an applied action did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A conversation was created.
    Started(ConversationId),
    /// The active conversation changed.
    Selected(ConversationId),
    /// A user message was appended.
    Sent(SendReceipt),
    /// Blank input, nothing happened.
    Skipped,
    /// A placeholder was resolved.
    Resolved {
        /// Conversation that received the reply.
        conversation_id: ConversationId,
        /// Id of the appended reply.
        reply_id: MessageId,
    },
    /// The ticket was unknown or already resolved.
    Ignored,
    /// A rename was processed.
    Renamed {
        /// Conversation that was addressed.
        id: ConversationId,
        /// Whether the title actually changed.
        changed: bool,
    },
    /// A conversation was removed.
    Deleted {
        /// Removed conversation.
        id: ConversationId,
        /// Active conversation after the removal.
        active: Option<ConversationId>,
    },
    /// Placeholders were dropped.
    Discarded(usize),
}

impl ActionOutcome {
    /// Whether the state differs from before the action.
    #[must_use]
    pub const fn changed_state(&self) -> bool {
        match self {
            Self::Skipped | Self::Ignored | Self::Discarded(0) => false,
            Self::Renamed { changed, .. } => *changed,
            _ => true,
        }
    }
}

/// Result of [`ConversationStore::restore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The slot held a valid snapshot.
    Restored {
        /// Number of conversations loaded.
        conversations: usize,
    },
    /// The slot was absent; the state was kept.
    Empty,
    /// The slot was unreadable or corrupt and was ignored; the state was kept.
    Discarded,
}

/// Owned conversation state with an injected durable slot.
pub struct ConversationStore {
    state: StoreState,
    storage: Arc<dyn SlotStorage>,
    slot: String,
}

impl ConversationStore {
    /// Create an empty store persisting to `slot`.
    #[must_use]
    pub fn new(storage: Arc<dyn SlotStorage>, slot: impl Into<String>) -> Self {
        Self {
            state: StoreState::default(),
            storage,
            slot: slot.into(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &StoreState {
        &self.state
    }

    /// Name of the durable slot.
    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Active conversation id.
    #[must_use]
    pub const fn active_conversation_id(&self) -> Option<ConversationId> {
        self.state.active_conversation_id
    }

    /// Look up a conversation.
    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.state.conversations.iter().find(|c| c.id == id)
    }

    /// Active conversation, if any.
    #[must_use]
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.state
            .active_conversation_id
            .and_then(|id| self.conversation(id))
    }

    /// Messages of the active conversation; empty when none is active.
    #[must_use]
    pub fn active_messages(&self) -> &[Message] {
        self.active_conversation()
            .map(|c| c.messages.as_slice())
            .unwrap_or_default()
    }

    /// Conversations ordered by `created_at` descending.
    ///
    /// Ties keep the most recently inserted first.
    #[must_use]
    pub fn conversations_by_recency(&self) -> Vec<&Conversation> {
        let mut listed: Vec<&Conversation> = self.state.conversations.iter().rev().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listed
    }

    /// Number of conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.conversations.len()
    }

    /// Whether the store holds no conversation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.conversations.is_empty()
    }

    /// Outstanding reply tickets.
    #[must_use]
    pub fn pending_replies(&self) -> &[PendingReply] {
        &self.state.pending_replies
    }

    /// Drop all conversations and tickets. The durable slot is untouched.
    pub fn clear(&mut self) {
        self.state = StoreState::default();
    }

    /// Apply one action.
    ///
    /// # Errors
    /// Returns [`StoreError::ConversationNotFound`] when `Select`, `Rename` or
    /// `Delete` name a conversation that does not exist, and
    /// [`StoreError::DuplicateConversation`] when `Start` reuses an id.
    pub fn apply(&mut self, action: ConversationAction) -> StoreResult<ActionOutcome> {
        let outcome = match action {
            ConversationAction::Start { id, at } => {
                if self.conversation(id).is_some() {
                    return Err(StoreError::DuplicateConversation(id));
                }
                self.start(id, at);
                ActionOutcome::Started(id)
            }
            ConversationAction::Select(id) => {
                if self.conversation(id).is_none() {
                    return Err(StoreError::ConversationNotFound(id));
                }
                self.state.active_conversation_id = Some(id);
                ActionOutcome::Selected(id)
            }
            ConversationAction::SendUser { text, at } => self.send_user(&text, at),
            ConversationAction::ResolveTyping {
                conversation_id,
                placeholder_id,
                outcome,
            } => self.resolve(conversation_id, placeholder_id, &outcome),
            ConversationAction::Rename { id, title } => self.rename(id, &title)?,
            ConversationAction::Delete(id) => self.delete(id)?,
            ConversationAction::DiscardPending => {
                let mut dropped = 0;
                for conversation in &mut self.state.conversations {
                    dropped += conversation.typing_count();
                    conversation.remove_typing();
                }
                self.state.pending_replies.clear();
                ActionOutcome::Discarded(dropped)
            }
        };

        debug!(?outcome, "conversation action applied");
        Ok(outcome)
    }

    /// Create a new empty conversation, make it active and return its id.
    pub fn start_conversation(&mut self) -> ConversationId {
        self.start_conversation_at(Utc::now())
    }

    /// Same as [`Self::start_conversation`] with an explicit creation time.
    pub fn start_conversation_at(&mut self, at: DateTime<Utc>) -> ConversationId {
        let id = ConversationId::new();
        if let Err(e) = self.apply(ConversationAction::Start { id, at }) {
            warn!("Conversation not started: {e}");
        }
        id
    }

    /// Make `id` the active conversation.
    ///
    /// # Errors
    /// Returns [`StoreError::ConversationNotFound`] if `id` does not exist.
    pub fn select_conversation(&mut self, id: ConversationId) -> StoreResult<()> {
        self.apply(ConversationAction::Select(id)).map(|_| ())
    }

    /// Append a user message and a typing placeholder.
    ///
    /// Returns `None` for blank input. Starts a conversation if none is active.
    pub fn send_user_message(&mut self, text: &str) -> Option<SendReceipt> {
        self.send_user_message_at(text, Utc::now())
    }

    /// Same as [`Self::send_user_message`] with an explicit time for a created conversation.
    pub fn send_user_message_at(&mut self, text: &str, at: DateTime<Utc>) -> Option<SendReceipt> {
        let action = ConversationAction::SendUser {
            text: text.to_string(),
            at,
        };
        match self.apply(action) {
            Ok(ActionOutcome::Sent(receipt)) => Some(receipt),
            _ => None,
        }
    }

    /// Replace the placeholder identified by `placeholder_id` with a reply.
    ///
    /// Unknown, already-resolved or orphaned placeholders are ignored.
    pub fn resolve_typing(
        &mut self,
        conversation_id: ConversationId,
        placeholder_id: MessageId,
        outcome: &ReplyOutcome,
    ) -> Option<MessageId> {
        let action = ConversationAction::ResolveTyping {
            conversation_id,
            placeholder_id,
            outcome: outcome.clone(),
        };
        match self.apply(action) {
            Ok(ActionOutcome::Resolved { reply_id, .. }) => Some(reply_id),
            _ => None,
        }
    }

    /// Rename a conversation. Blank titles leave it unchanged.
    ///
    /// Returns whether the title changed.
    ///
    /// # Errors
    /// Returns [`StoreError::ConversationNotFound`] if `id` does not exist.
    pub fn rename_conversation(&mut self, id: ConversationId, title: &str) -> StoreResult<bool> {
        let action = ConversationAction::Rename {
            id,
            title: title.to_string(),
        };
        match self.apply(action)? {
            ActionOutcome::Renamed { changed, .. } => Ok(changed),
            _ => Ok(false),
        }
    }

    /// Remove a conversation and return the new active id.
    ///
    /// # Errors
    /// Returns [`StoreError::ConversationNotFound`] if `id` does not exist.
    pub fn delete_conversation(&mut self, id: ConversationId) -> StoreResult<Option<ConversationId>> {
        match self.apply(ConversationAction::Delete(id))? {
            ActionOutcome::Deleted { active, .. } => Ok(active),
            _ => Ok(self.state.active_conversation_id),
        }
    }

    /// Drop all typing placeholders and tickets; returns how many placeholders went.
    pub fn discard_pending(&mut self) -> usize {
        match self.apply(ConversationAction::DiscardPending) {
            Ok(ActionOutcome::Discarded(n)) => n,
            _ => 0,
        }
    }

    /// Write the full state to the durable slot.
    ///
    /// # Errors
    /// Returns an error if encoding or the slot write fails.
    pub async fn persist(&self) -> StorageResult<()> {
        let blob = snapshot::encode(&self.state)?;
        self.storage.write(&self.slot, blob).await
    }

    /// Replace the state with the slot contents.
    ///
    /// Only a valid snapshot replaces the state. Absent, unreadable or corrupt
    /// slots leave the current state untouched; failures are logged, never
    /// returned.
    pub async fn restore(&mut self) -> RestoreOutcome {
        let blob = match self.storage.read(&self.slot).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return RestoreOutcome::Empty,
            Err(e) => {
                warn!("Failed to read slot {}: {e}", self.slot);
                return RestoreOutcome::Discarded;
            }
        };

        match snapshot::decode(&blob) {
            Ok(state) => {
                let conversations = state.conversations.len();
                self.state = state;
                debug!(conversations, "conversation state restored");
                RestoreOutcome::Restored { conversations }
            }
            Err(e) => {
                warn!("Ignoring unusable snapshot in slot {}: {e}", self.slot);
                RestoreOutcome::Discarded
            }
        }
    }

    fn start(&mut self, id: ConversationId, at: DateTime<Utc>) {
        self.state.conversations.push(Conversation::new(id, at));
        self.state.active_conversation_id = Some(id);
    }

    fn send_user(&mut self, text: &str, at: DateTime<Utc>) -> ActionOutcome {
        let text = text.trim();
        if text.is_empty() {
            return ActionOutcome::Skipped;
        }

        let (conversation_id, created_conversation) = match self.active_conversation_id() {
            Some(id) => (id, false),
            None => {
                let id = ConversationId::new();
                self.start(id, at);
                (id, true)
            }
        };

        let state = &mut self.state;
        let Some(conversation) = find_mut(&mut state.conversations, conversation_id) else {
            return ActionOutcome::Skipped;
        };

        let is_first = conversation.messages.is_empty();
        conversation.remove_typing();

        let message_id = state.message_ids.issue();
        conversation.messages.push(Message::user(message_id, text));
        if is_first && conversation.title.is_empty() {
            conversation.title = text.to_string();
        }

        let placeholder_id = state.message_ids.issue();
        conversation.messages.push(Message::typing(placeholder_id));
        state.pending_replies.push(PendingReply {
            placeholder_id,
            conversation_id,
        });

        ActionOutcome::Sent(SendReceipt {
            conversation_id,
            message_id,
            placeholder_id,
            created_conversation,
        })
    }

    fn resolve(
        &mut self,
        conversation_id: ConversationId,
        placeholder_id: MessageId,
        outcome: &ReplyOutcome,
    ) -> ActionOutcome {
        let state = &mut self.state;
        let Some(position) = state.pending_replies.iter().position(|p| {
            p.placeholder_id == placeholder_id && p.conversation_id == conversation_id
        }) else {
            return ActionOutcome::Ignored;
        };
        state.pending_replies.remove(position);

        let Some(conversation) = find_mut(&mut state.conversations, conversation_id) else {
            return ActionOutcome::Ignored;
        };

        conversation.remove_typing();
        let reply_id = state.message_ids.issue();
        conversation.messages.push(Message::ai(reply_id, outcome.text()));

        let still_pending = state
            .pending_replies
            .iter()
            .any(|p| p.conversation_id == conversation_id);
        if still_pending {
            conversation
                .messages
                .push(Message::typing(state.message_ids.issue()));
        }

        ActionOutcome::Resolved {
            conversation_id,
            reply_id,
        }
    }

    fn rename(&mut self, id: ConversationId, title: &str) -> StoreResult<ActionOutcome> {
        let conversation = find_mut(&mut self.state.conversations, id)
            .ok_or(StoreError::ConversationNotFound(id))?;

        let title = title.trim();
        let changed = !title.is_empty() && conversation.title != title;
        if changed {
            conversation.title = title.to_string();
        }
        Ok(ActionOutcome::Renamed { id, changed })
    }

    fn delete(&mut self, id: ConversationId) -> StoreResult<ActionOutcome> {
        let position = self
            .state
            .conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or(StoreError::ConversationNotFound(id))?;

        self.state.conversations.remove(position);
        self.state.pending_replies.retain(|p| p.conversation_id != id);

        if self.state.active_conversation_id == Some(id) {
            self.state.active_conversation_id = self
                .state
                .conversations
                .iter()
                .max_by_key(|c| c.created_at)
                .map(|c| c.id);
        }

        Ok(ActionOutcome::Deleted {
            id,
            active: self.state.active_conversation_id,
        })
    }
}

fn find_mut(conversations: &mut [Conversation], id: ConversationId) -> Option<&mut Conversation> {
    conversations.iter_mut().find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::conversations::types::{FALLBACK_REPLY, Sender};
    use crate::storage::MemorySlotStorage;

    fn store() -> ConversationStore {
        ConversationStore::new(Arc::new(MemorySlotStorage::new()), "userConversations")
    }

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn texts(store: &ConversationStore) -> Vec<(String, Sender, bool)> {
        store
            .active_messages()
            .iter()
            .map(|m| (m.text.clone(), m.sender, m.is_typing))
            .collect()
    }

    #[test]
    fn test_start_conversation_is_empty_and_active() {
        let mut store = store();
        let id = store.start_conversation();
        let conversation = store.conversation(id).unwrap();
        assert_eq!(conversation.title, "");
        assert!(conversation.messages.is_empty());
        assert_eq!(store.active_conversation_id(), Some(id));
    }

    #[test]
    fn test_start_with_existing_id_is_rejected() {
        let mut store = store();
        let id = store.start_conversation_at(t(0));
        let other = store.start_conversation_at(t(1));

        assert_eq!(
            store.apply(ConversationAction::Start { id, at: t(2) }),
            Err(StoreError::DuplicateConversation(id))
        );
        assert_eq!(store.len(), 2);
        assert_eq!(store.active_conversation_id(), Some(other));
        assert_eq!(store.conversation(id).unwrap().created_at, t(0));
    }

    #[test]
    fn test_send_without_active_creates_one_conversation() {
        let mut store = store();
        let receipt = store.send_user_message("  Plan a trip to Lisbon  ").unwrap();

        assert!(receipt.created_conversation);
        assert_eq!(store.len(), 1);
        let conversation = store.conversation(receipt.conversation_id).unwrap();
        assert_eq!(conversation.title, "Plan a trip to Lisbon");
        assert_eq!(conversation.messages[0].text, "Plan a trip to Lisbon");
    }

    #[test]
    fn test_blank_send_is_noop() {
        let mut store = store();
        assert!(store.send_user_message("   \n\t").is_none());
        assert!(store.is_empty());
        assert_eq!(
            store
                .apply(ConversationAction::SendUser {
                    text: String::new(),
                    at: t(0),
                })
                .unwrap(),
            ActionOutcome::Skipped
        );
    }

    #[test]
    fn test_placeholder_follows_user_message() {
        let mut store = store();
        let receipt = store.send_user_message("Hello").unwrap();
        let messages = store.active_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].id, receipt.placeholder_id);
        assert!(messages[1].is_typing);
        assert_eq!(messages[1].sender, Sender::Ai);
    }

    #[test]
    fn test_title_not_overwritten_by_later_messages() {
        let mut store = store();
        let receipt = store.send_user_message("First").unwrap();
        store.resolve_typing(
            receipt.conversation_id,
            receipt.placeholder_id,
            &ReplyOutcome::Success("ok".to_string()),
        );
        store.send_user_message("Second").unwrap();
        assert_eq!(store.active_conversation().unwrap().title, "First");
    }

    #[test]
    fn test_rename_before_first_message_wins() {
        let mut store = store();
        let id = store.start_conversation();
        assert!(store.rename_conversation(id, "Recipes").unwrap());
        store.send_user_message("What can I cook with leeks?").unwrap();
        assert_eq!(store.conversation(id).unwrap().title, "Recipes");
    }

    #[test]
    fn test_success_scenario() {
        let mut store = store();
        store.start_conversation();
        let receipt = store.send_user_message("Hello").unwrap();
        store.resolve_typing(
            receipt.conversation_id,
            receipt.placeholder_id,
            &ReplyOutcome::Success("Hi there".to_string()),
        );

        assert_eq!(
            texts(&store),
            vec![
                ("Hello".to_string(), Sender::User, false),
                ("Hi there".to_string(), Sender::Ai, false),
            ]
        );
        assert!(store.pending_replies().is_empty());
    }

    #[test]
    fn test_failure_scenario_appends_fallback() {
        let mut store = store();
        let receipt = store.send_user_message("Hello").unwrap();
        store.resolve_typing(
            receipt.conversation_id,
            receipt.placeholder_id,
            &ReplyOutcome::Failure,
        );

        let messages = store.active_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, FALLBACK_REPLY);
        assert_eq!(messages[1].sender, Sender::Ai);
    }

    #[test]
    fn test_resolve_twice_is_idempotent() {
        let mut store = store();
        let receipt = store.send_user_message("Hello").unwrap();
        let outcome = ReplyOutcome::Success("Hi".to_string());
        assert!(
            store
                .resolve_typing(receipt.conversation_id, receipt.placeholder_id, &outcome)
                .is_some()
        );
        let before = store.state().clone();

        let second = store
            .apply(ConversationAction::ResolveTyping {
                conversation_id: receipt.conversation_id,
                placeholder_id: receipt.placeholder_id,
                outcome,
            })
            .unwrap();

        assert_eq!(second, ActionOutcome::Ignored);
        assert!(!second.changed_state());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_overlapping_sends_resolve_independently() {
        let mut store = store();
        let first = store.send_user_message("one").unwrap();
        let second = store.send_user_message("two").unwrap();
        let conversation = store.active_conversation().unwrap();
        assert_eq!(conversation.typing_count(), 1);

        // Slow first reply lands after the second message was sent.
        store.resolve_typing(
            first.conversation_id,
            first.placeholder_id,
            &ReplyOutcome::Success("reply one".to_string()),
        );
        let conversation = store.active_conversation().unwrap();
        assert_eq!(conversation.typing_count(), 1);
        assert!(conversation.messages.last().unwrap().is_typing);

        store.resolve_typing(
            second.conversation_id,
            second.placeholder_id,
            &ReplyOutcome::Success("reply two".to_string()),
        );
        assert_eq!(
            texts(&store),
            vec![
                ("one".to_string(), Sender::User, false),
                ("two".to_string(), Sender::User, false),
                ("reply one".to_string(), Sender::Ai, false),
                ("reply two".to_string(), Sender::Ai, false),
            ]
        );
        assert!(store.pending_replies().is_empty());
    }

    #[test]
    fn test_typing_count_never_exceeds_one() {
        let mut store = store();
        let mut receipts = Vec::new();
        for i in 0..5 {
            receipts.push(store.send_user_message(&format!("message {i}")).unwrap());
            assert!(store.active_conversation().unwrap().typing_count() <= 1);
        }
        for receipt in receipts.iter().rev() {
            store.resolve_typing(
                receipt.conversation_id,
                receipt.placeholder_id,
                &ReplyOutcome::Failure,
            );
            assert!(store.active_conversation().unwrap().typing_count() <= 1);
        }
        assert_eq!(store.active_conversation().unwrap().typing_count(), 0);
    }

    #[test]
    fn test_message_ids_strictly_increase() {
        let mut store = store();
        let a = store.send_user_message("a").unwrap();
        let b = store.send_user_message("b").unwrap();
        store.resolve_typing(a.conversation_id, a.placeholder_id, &ReplyOutcome::Failure);
        store.resolve_typing(b.conversation_id, b.placeholder_id, &ReplyOutcome::Failure);
        let ids: Vec<MessageId> = store.active_messages().iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_resolve_for_deleted_conversation_is_noop() {
        let mut store = store();
        let receipt = store.send_user_message("Hello").unwrap();
        store.delete_conversation(receipt.conversation_id).unwrap();
        assert!(
            store
                .resolve_typing(
                    receipt.conversation_id,
                    receipt.placeholder_id,
                    &ReplyOutcome::Success("late".to_string()),
                )
                .is_none()
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_resolve_with_wrong_conversation_is_ignored() {
        let mut store = store();
        let receipt = store.send_user_message("Hello").unwrap();
        let other = store.start_conversation();
        assert!(
            store
                .resolve_typing(other, receipt.placeholder_id, &ReplyOutcome::Failure)
                .is_none()
        );
        assert_eq!(store.pending_replies().len(), 1);
    }

    #[test]
    fn test_select_missing_conversation_fails() {
        let mut store = store();
        let missing = ConversationId::new();
        assert_eq!(
            store.select_conversation(missing),
            Err(StoreError::ConversationNotFound(missing))
        );
    }

    #[test]
    fn test_select_switches_active_history() {
        let mut store = store();
        let first = store.start_conversation();
        store.send_user_message("in first").unwrap();
        store.start_conversation();
        assert!(store.active_messages().is_empty());
        store.select_conversation(first).unwrap();
        assert_eq!(store.active_messages()[0].text, "in first");
    }

    #[test]
    fn test_rename_whitespace_keeps_title() {
        let mut store = store();
        let receipt = store.send_user_message("Original").unwrap();
        assert!(
            !store
                .rename_conversation(receipt.conversation_id, "   ")
                .unwrap()
        );
        assert_eq!(store.active_conversation().unwrap().title, "Original");
    }

    #[test]
    fn test_rename_trims() {
        let mut store = store();
        let id = store.start_conversation();
        store.rename_conversation(id, "  Weekend plans ").unwrap();
        assert_eq!(store.conversation(id).unwrap().title, "Weekend plans");
    }

    #[test]
    fn test_rename_missing_fails() {
        let mut store = store();
        assert!(store.rename_conversation(ConversationId::new(), "x").is_err());
    }

    #[test]
    fn test_delete_active_selects_latest_remaining() {
        let mut store = store();
        let oldest = store.start_conversation_at(t(0));
        let newest = store.start_conversation_at(t(20));
        let middle = store.start_conversation_at(t(10));
        store.select_conversation(oldest).unwrap();

        let active = store.delete_conversation(oldest).unwrap();
        assert_eq!(active, Some(newest));
        assert_ne!(active, Some(middle));
    }

    #[test]
    fn test_delete_active_scenario() {
        let mut store = store();
        let a = store.start_conversation_at(t(1));
        let b = store.start_conversation_at(t(2));
        store.select_conversation(a).unwrap();
        store.delete_conversation(a).unwrap();
        assert_eq!(store.active_conversation_id(), Some(b));
    }

    #[test]
    fn test_delete_last_clears_active_and_next_send_creates() {
        let mut store = store();
        let id = store.start_conversation();
        assert_eq!(store.delete_conversation(id).unwrap(), None);
        assert!(store.active_conversation_id().is_none());

        let receipt = store.send_user_message("again").unwrap();
        assert!(receipt.created_conversation);
        assert_ne!(receipt.conversation_id, id);
    }

    #[test]
    fn test_delete_inactive_keeps_active() {
        let mut store = store();
        let a = store.start_conversation_at(t(1));
        let b = store.start_conversation_at(t(2));
        store.delete_conversation(a).unwrap();
        assert_eq!(store.active_conversation_id(), Some(b));
    }

    #[test]
    fn test_delete_missing_fails() {
        let mut store = store();
        assert!(store.delete_conversation(ConversationId::new()).is_err());
    }

    #[test]
    fn test_listing_is_created_at_descending() {
        let mut store = store();
        let a = store.start_conversation_at(t(5));
        let b = store.start_conversation_at(t(1));
        let c = store.start_conversation_at(t(9));
        let order: Vec<ConversationId> = store
            .conversations_by_recency()
            .iter()
            .map(|conv| conv.id)
            .collect();
        assert_eq!(order, vec![c, a, b]);
    }

    #[test]
    fn test_discard_pending_clears_placeholders() {
        let mut store = store();
        store.send_user_message("one").unwrap();
        store.start_conversation();
        store.send_user_message("two").unwrap();
        assert_eq!(store.discard_pending(), 2);
        assert!(store.pending_replies().is_empty());
        assert!(
            store
                .state()
                .conversations
                .iter()
                .all(|c| c.typing_count() == 0)
        );
    }

    #[tokio::test]
    async fn test_persist_restore_round_trip() {
        let storage: Arc<dyn SlotStorage> = Arc::new(MemorySlotStorage::new());
        let mut saved = ConversationStore::new(Arc::clone(&storage), "userConversations");
        let a = saved.send_user_message_at("Hello", t(0)).unwrap();
        saved.resolve_typing(
            a.conversation_id,
            a.placeholder_id,
            &ReplyOutcome::Success("Hi there".to_string()),
        );
        saved.start_conversation_at(t(3));
        saved.send_user_message("pending one").unwrap();
        saved
            .rename_conversation(a.conversation_id, "Greetings")
            .unwrap();
        saved.persist().await.unwrap();

        let mut restored = ConversationStore::new(storage, "userConversations");
        let outcome = restored.restore().await;

        assert_eq!(outcome, RestoreOutcome::Restored { conversations: 2 });
        assert_eq!(restored.state(), saved.state());
    }

    #[tokio::test]
    async fn test_restore_malformed_yields_empty() {
        let storage = Arc::new(MemorySlotStorage::new());
        storage
            .write("userConversations", "{\"conversations\": [".to_string())
            .await
            .unwrap();
        let mut store = ConversationStore::new(storage, "userConversations");

        assert_eq!(store.restore().await, RestoreOutcome::Discarded);
        assert!(store.is_empty());
        assert!(store.active_conversation_id().is_none());
    }

    #[tokio::test]
    async fn test_restore_malformed_keeps_current_state() {
        let storage = Arc::new(MemorySlotStorage::new());
        storage
            .write("userConversations", "not json".to_string())
            .await
            .unwrap();
        let mut store = ConversationStore::new(storage, "userConversations");
        let id = store.start_conversation();

        assert_eq!(store.restore().await, RestoreOutcome::Discarded);
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_conversation_id(), Some(id));
    }

    #[tokio::test]
    async fn test_restore_absent_slot_is_empty() {
        let mut store = store();
        assert_eq!(store.restore().await, RestoreOutcome::Empty);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_restore_absent_slot_keeps_current_state() {
        let mut store = store();
        let receipt = store.send_user_message("Hello").unwrap();

        assert_eq!(store.restore().await, RestoreOutcome::Empty);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.active_conversation_id(),
            Some(receipt.conversation_id)
        );
        assert_eq!(store.active_messages()[0].text, "Hello");
    }

    #[tokio::test]
    async fn test_restored_counter_continues() {
        let storage: Arc<dyn SlotStorage> = Arc::new(MemorySlotStorage::new());
        let mut saved = ConversationStore::new(Arc::clone(&storage), "slot");
        let receipt = saved.send_user_message("Hello").unwrap();
        saved.persist().await.unwrap();

        let mut restored = ConversationStore::new(storage, "slot");
        restored.restore().await;
        restored.discard_pending();
        let next = restored.send_user_message("Again").unwrap();
        assert!(next.message_id > receipt.placeholder_id);
    }
}
