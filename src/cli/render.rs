//! Plain-text rendering of conversations and profiles.

use std::fmt::Write;

use crate::conversations::{ConversationStore, Message, Sender};
use crate::providers::UserProfile;

/// Label shown for assistant messages.
pub const ASSISTANT_LABEL: &str = "Galaxy AI";

/// Command reference.
pub const HELP: &str = "\
Type a message to chat. Commands:
  /new                 start a new conversation
  /list                list conversations, newest first
  /switch <n>          open conversation <n>
  /rename <n> <title>  rename conversation <n>
  /delete <n>          delete conversation <n>
  /login <provider>    sign in with google or facebook
  /logout              sign out
  /whoami              show the signed-in user
  /help                show this help
  /quit                exit
";

/// Render one message line.
#[must_use]
pub fn render_message(message: &Message) -> String {
    if message.is_typing {
        return format!("{ASSISTANT_LABEL} is typing...");
    }
    match message.sender {
        Sender::User => format!("You: {}", message.text),
        Sender::Ai => format!("{ASSISTANT_LABEL}: {}", message.text),
    }
}

/// Render a message history, one line per message.
#[must_use]
pub fn render_history(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "(no messages yet)\n".to_string();
    }
    messages.iter().fold(String::new(), |mut out, message| {
        let _ = writeln!(out, "{}", render_message(message));
        out
    })
}

/// Render the conversation listing, newest first, marking the active one.
#[must_use]
pub fn render_listing(store: &ConversationStore) -> String {
    let listed = store.conversations_by_recency();
    if listed.is_empty() {
        return "No conversations yet. Type a message to start one.\n".to_string();
    }

    let active = store.active_conversation_id();
    let mut out = String::new();
    for (position, conversation) in listed.iter().enumerate() {
        let marker = if Some(conversation.id) == active { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {:>2}. {} ({} messages, {})",
            position + 1,
            conversation.display_title(),
            conversation.messages.len(),
            conversation.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    out
}

/// Render the signed-in user.
#[must_use]
pub fn render_profile(profile: Option<&UserProfile>) -> String {
    match profile {
        Some(profile) if profile.email.is_empty() => {
            format!("Signed in as {} (@{})\n", profile.display_name(), profile.username)
        }
        Some(profile) => format!(
            "Signed in as {} (@{}, {})\n",
            profile.display_name(),
            profile.username,
            profile.email
        ),
        None => "Not signed in. Conversations are not saved.\n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::core::ids::MessageId;
    use crate::providers::ProfileDetails;
    use crate::storage::MemorySlotStorage;

    #[test]
    fn test_render_messages() {
        let messages = vec![
            Message::user(MessageId(1), "Hi"),
            Message::ai(MessageId(2), "Hello!"),
            Message::typing(MessageId(3)),
        ];
        assert_eq!(
            render_history(&messages),
            "You: Hi\nGalaxy AI: Hello!\nGalaxy AI is typing...\n"
        );
        assert_eq!(render_history(&[]), "(no messages yet)\n");
    }

    #[test]
    fn test_listing_marks_active() {
        let mut store = ConversationStore::new(Arc::new(MemorySlotStorage::new()), "slot");
        let older = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap();
        store.start_conversation_at(newer);
        let first = store.start_conversation_at(older);
        store.send_user_message("Plan a trip").unwrap();
        store.select_conversation(first).unwrap();

        let listing = render_listing(&store);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("   1. New conversation (0 messages"));
        assert!(lines[1].starts_with("*  2. Plan a trip (2 messages"));
    }

    #[test]
    fn test_render_profile() {
        let profile = UserProfile {
            id: 7,
            username: "ada".to_string(),
            email: String::new(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            profile: ProfileDetails::default(),
        };
        assert_eq!(
            render_profile(Some(&profile)),
            "Signed in as Ada Lovelace (@ada)\n"
        );
        assert!(render_profile(None).starts_with("Not signed in"));
    }
}
