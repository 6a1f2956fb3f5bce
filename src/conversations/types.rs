//! Types for conversation management.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{ConversationId, MessageId};

/// Reply shown when the chat provider cannot be reached.
pub const FALLBACK_REPLY: &str =
    "I'm having trouble connecting. Please check your connection or try again later.";

/// Author of a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Typed by the user.
    User,
    /// Generated by the chat provider.
    Ai,
}

impl Sender {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "ai" => Ok(Self::Ai),
            _ => Err(value.to_string()),
        }
    }
}

/// A single message in a conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store-issued id; also the causal order.
    pub id: MessageId,
    /// Message body.
    pub text: String,
    /// Author.
    pub sender: Sender,
    /// Transient "AI is typing" marker.
    #[serde(default)]
    pub is_typing: bool,
}

impl Message {
    /// Build a user message.
    #[must_use]
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::User,
            is_typing: false,
        }
    }

    /// Build an AI message.
    #[must_use]
    pub fn ai(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::Ai,
            is_typing: false,
        }
    }

    /// Build a typing placeholder.
    #[must_use]
    pub const fn typing(id: MessageId) -> Self {
        Self {
            id,
            text: String::new(),
            sender: Sender::Ai,
            is_typing: true,
        }
    }
}

/// A titled thread of messages.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier.
    pub id: ConversationId,
    /// Display title; empty until the first user message or a rename.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Messages in causal order.
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub const fn new(id: ConversationId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: String::new(),
            created_at,
            messages: Vec::new(),
        }
    }

    /// The visible typing placeholder, if any.
    #[must_use]
    pub fn typing_placeholder(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_typing)
    }

    /// Number of typing placeholders currently shown.
    #[must_use]
    pub fn typing_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_typing).count()
    }

    /// Title for listings, with a stand-in for untitled threads.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "New conversation"
        } else {
            &self.title
        }
    }

    pub(crate) fn remove_typing(&mut self) {
        self.messages.retain(|m| !m.is_typing);
    }
}

/// An outstanding reply: issued by a send, consumed by its resolution.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReply {
    /// Id of the placeholder created by the send.
    pub placeholder_id: MessageId,
    /// Conversation the reply belongs to.
    pub conversation_id: ConversationId,
}

/// Handle returned by a send so the caller can resolve its placeholder later.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SendReceipt {
    /// Conversation that received the message.
    pub conversation_id: ConversationId,
    /// Id of the user message.
    pub message_id: MessageId,
    /// Id of the placeholder; resolution is keyed by it.
    pub placeholder_id: MessageId,
    /// Whether the send had to create the conversation.
    pub created_conversation: bool,
}

/// Result of a chat provider call, as seen by the store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplyOutcome {
    /// Provider produced text.
    Success(String),
    /// Provider failed; the fallback reply is shown.
    Failure,
}

impl ReplyOutcome {
    /// Text to append for this outcome.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Success(text) => text,
            Self::Failure => FALLBACK_REPLY,
        }
    }
}
