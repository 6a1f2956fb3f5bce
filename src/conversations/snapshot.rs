//! Serialized form of the store state.
//!
//! The JSON shape follows the browser-era `userConversations` entry
//! (`createdAt`, `isTyping`, `sender: "user" | "ai"`) wrapped in a versioned
//! envelope. Decoding rejects snapshots that break a store invariant.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::errors::{StorageError, StorageResult};
use crate::core::ids::{ConversationId, MessageIdGenerator};

use super::types::{Conversation, PendingReply};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// In-memory state owned by the conversation store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreState {
    /// All conversations, in insertion order.
    pub conversations: Vec<Conversation>,
    /// Active conversation, if any.
    pub active_conversation_id: Option<ConversationId>,
    /// Outstanding reply tickets.
    pub pending_replies: Vec<PendingReply>,
    /// Source of message ids.
    pub message_ids: MessageIdGenerator,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSnapshot {
    version: u32,
    conversations: Vec<Conversation>,
    active_conversation_id: Option<ConversationId>,
    #[serde(default)]
    pending_replies: Vec<PendingReply>,
    next_message_id: u64,
}

/// Serialize a state to its JSON blob.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode(state: &StoreState) -> StorageResult<String> {
    let snapshot = StoreSnapshot {
        version: SNAPSHOT_VERSION,
        conversations: state.conversations.clone(),
        active_conversation_id: state.active_conversation_id,
        pending_replies: state.pending_replies.clone(),
        next_message_id: state.message_ids.peek(),
    };
    Ok(serde_json::to_string(&snapshot)?)
}

/// Parse and validate a JSON blob.
///
/// # Errors
/// Returns an error if the blob is not valid JSON, has an unknown version,
/// or violates a store invariant.
pub fn decode(blob: &str) -> StorageResult<StoreState> {
    let snapshot: StoreSnapshot = serde_json::from_str(blob)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StorageError::UnsupportedVersion(snapshot.version));
    }

    let state = StoreState {
        conversations: snapshot.conversations,
        active_conversation_id: snapshot.active_conversation_id,
        pending_replies: snapshot.pending_replies,
        message_ids: MessageIdGenerator::starting_at(snapshot.next_message_id),
    };
    validate(&state)?;
    Ok(state)
}

/// Check every store invariant on `state`.
///
/// # Errors
/// Returns [`StorageError::Corrupt`] describing the first violation found.
pub fn validate(state: &StoreState) -> StorageResult<()> {
    let mut seen = HashSet::with_capacity(state.conversations.len());
    for conversation in &state.conversations {
        if !seen.insert(conversation.id) {
            return Err(corrupt(format!("duplicate conversation {}", conversation.id)));
        }
        if conversation.typing_count() > 1 {
            return Err(corrupt(format!(
                "conversation {} has more than one typing placeholder",
                conversation.id
            )));
        }
        let ordered = conversation
            .messages
            .windows(2)
            .all(|pair| pair[0].id < pair[1].id);
        if !ordered {
            return Err(corrupt(format!(
                "message ids out of order in conversation {}",
                conversation.id
            )));
        }
        if let Some(last) = conversation.messages.last() {
            if last.id.get() >= state.message_ids.peek() {
                return Err(corrupt(format!(
                    "message id {} not below next id {}",
                    last.id,
                    state.message_ids.peek()
                )));
            }
        }
    }

    if let Some(active) = state.active_conversation_id {
        if !seen.contains(&active) {
            return Err(corrupt(format!("active conversation {active} does not exist")));
        }
    }

    for pending in &state.pending_replies {
        if !seen.contains(&pending.conversation_id) {
            return Err(corrupt(format!(
                "pending reply {} points at missing conversation {}",
                pending.placeholder_id, pending.conversation_id
            )));
        }
    }

    Ok(())
}

fn corrupt(reason: String) -> StorageError {
    StorageError::Corrupt(reason)
}
