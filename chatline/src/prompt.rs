//! Prompt assembly: fixed system instruction plus a short history window.

use crate::conversation::ConversationStore;
use crate::message::Turn;
use crate::provider::{ChatMessage, ChatRole};

/// System instruction sent first in every prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful and friendly AI assistant on WhatsApp.\n\
You provide clear, concise, and accurate responses while maintaining a conversational tone.\n\
Keep responses brief and suitable for WhatsApp, ideally under 3-4 sentences unless more detail is specifically requested.";

/// Number of turns sent to the model, counting the new user message.
pub const HISTORY_WINDOW: usize = 5;

/// Record `user_text` as a new user turn and build the prompt for it.
///
/// The window is taken after the append, so it holds the new message plus
/// at most `HISTORY_WINDOW - 1` earlier turns.
pub async fn build_prompt(store: &ConversationStore, sender: &str, user_text: &str) -> Vec<ChatMessage> {
    store.append(sender, Turn::user(user_text)).await;
    let history = store.recent(sender, HISTORY_WINDOW).await;
    assemble(&history)
}

/// System entry followed by `history` reduced to role and text.
pub fn assemble(history: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::new(ChatRole::System, SYSTEM_PROMPT));
    messages.extend(
        history
            .iter()
            .map(|turn| ChatMessage::new(turn.role().into(), turn.content())),
    );
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_message_prompt() {
        let store = ConversationStore::new();
        let prompt = build_prompt(&store, "whatsapp:+15550001", "hello").await;

        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0], ChatMessage::new(ChatRole::System, SYSTEM_PROMPT));
        assert_eq!(prompt[1], ChatMessage::new(ChatRole::User, "hello"));
        assert_eq!(store.len("whatsapp:+15550001").await, 1);
    }

    #[tokio::test]
    async fn test_window_includes_new_message_and_four_prior() {
        let store = ConversationStore::new();
        let sender = "whatsapp:+15550002";
        for i in 0..3 {
            store.append(sender, Turn::user(format!("q{i}"))).await;
            store.append(sender, Turn::assistant(format!("a{i}"))).await;
        }

        let prompt = build_prompt(&store, sender, "q3").await;

        assert_eq!(prompt.len(), HISTORY_WINDOW + 1);
        assert_eq!(prompt[0].role, ChatRole::System);
        let tail: Vec<(ChatRole, &str)> = prompt[1..]
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            tail,
            vec![
                (ChatRole::User, "q1"),
                (ChatRole::Assistant, "a1"),
                (ChatRole::User, "q2"),
                (ChatRole::Assistant, "a2"),
                (ChatRole::User, "q3"),
            ]
        );
    }

    #[tokio::test]
    async fn test_system_entry_is_always_first_and_fixed() {
        let store = ConversationStore::new();
        for i in 0..12 {
            let prompt = build_prompt(&store, "sender", &format!("message {i}")).await;
            assert_eq!(prompt[0].role, ChatRole::System);
            assert_eq!(prompt[0].content, SYSTEM_PROMPT);
            assert!(prompt.len() <= HISTORY_WINDOW + 1);
            assert_eq!(prompt.iter().filter(|m| m.role == ChatRole::System).count(), 1);
        }
    }

    #[test]
    fn test_assemble_empty_history() {
        let prompt = assemble(&[]);
        assert_eq!(prompt, vec![ChatMessage::new(ChatRole::System, SYSTEM_PROMPT)]);
    }
}
