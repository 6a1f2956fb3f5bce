//! Conversation management module.
//!
//! This module provides the conversation store, its data model and the
//! snapshot format used for the durable slot.

pub mod snapshot;
pub mod store;
pub mod types;

pub use snapshot::StoreState;
pub use store::{ActionOutcome, ConversationAction, ConversationStore, RestoreOutcome};
pub use types::{
    Conversation, FALLBACK_REPLY, Message, PendingReply, ReplyOutcome, SendReceipt, Sender,
};
