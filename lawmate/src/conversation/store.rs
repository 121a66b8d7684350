//! Ordered message history with by-id updates.

use crate::error::{ChatError, Result};
use crate::models::{Message, MessageId, MessageRole};

/// Greeting every conversation starts with.
pub const GREETING: &str = "👋 Hello! I'm **LawMate**, your AI legal assistant specializing in Indian law. How can I help you today?";

/// Content shown in place of an answer whose exchange failed.
pub const ERROR_MARKER: &str = "⚠️ Error: Could not fetch reply.";

/// The message history of one session.
///
/// Insertion order is display order. Messages are never reordered or
/// removed individually; [`Conversation::reset`] discards everything.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation holding only the greeting.
    pub fn new() -> Self {
        Self {
            messages: vec![Self::greeting()],
        }
    }

    fn greeting() -> Message {
        Message::new(MessageRole::Assistant, GREETING)
    }

    /// Add a message at the end.
    pub fn append(&mut self, message: Message) {
        debug_assert!(
            !self.contains(message.id),
            "message ids must be unique within a conversation"
        );
        self.messages.push(message);
    }

    /// Replace the message `id` with `mutator` applied to a copy of it.
    pub fn update<F>(&mut self, id: MessageId, mutator: F) -> Result<&Message>
    where
        F: FnOnce(Message) -> Message,
    {
        let slot = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(ChatError::MessageNotFound(id))?;

        let updated = mutator(slot.clone());
        debug_assert_eq!(updated.id, id, "mutator must not change the message id");
        debug_assert_eq!(updated.role, slot.role, "mutator must not change the role");
        *slot = updated;
        Ok(&*slot)
    }

    /// Discard the history and start over with a fresh greeting.
    pub fn reset(&mut self) {
        self.messages = vec![Self::greeting()];
    }

    /// Read-only view of the messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Owned copy of the history, detached from later updates.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Look up a message by id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Whether a message with `id` exists.
    pub fn contains(&self, id: MessageId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    #[test]
    fn starts_with_greeting() {
        let conversation = Conversation::new();
        assert_eq!(conversation.len(), 1);
        let greeting = &conversation.messages()[0];
        assert_eq!(greeting.role, MessageRole::Assistant);
        assert_eq!(greeting.content, GREETING);
    }

    #[test]
    fn append_keeps_order() {
        let mut conversation = Conversation::new();
        let user = Message::user("What is bail?");
        let placeholder = Message::placeholder();
        let (user_id, placeholder_id) = (user.id, placeholder.id);

        conversation.append(user);
        conversation.append(placeholder);

        let ids: Vec<_> = conversation.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids[1..], [user_id, placeholder_id]);
    }

    #[test]
    fn update_targets_by_id() {
        let mut conversation = Conversation::new();
        let first = Message::placeholder();
        let second = Message::placeholder();
        let (first_id, second_id) = (first.id, second.id);
        conversation.append(first);
        conversation.append(second);

        conversation
            .update(second_id, |m| m.with_appended("hello"))
            .unwrap();
        conversation
            .update(second_id, |m| m.with_sources(vec![Source::new("s")]))
            .unwrap();

        assert_eq!(conversation.get(first_id).unwrap().content, "");
        let second = conversation.get(second_id).unwrap();
        assert_eq!(second.content, "hello");
        assert_eq!(second.sources.len(), 1);
        assert_eq!(conversation.messages()[2].id, second_id);
    }

    #[test]
    fn update_unknown_id_reports_not_found() {
        let mut conversation = Conversation::new();
        let missing = MessageId::generate();
        let err = conversation.update(missing, |m| m).unwrap_err();
        assert!(matches!(err, ChatError::MessageNotFound(id) if id == missing));
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut conversation = Conversation::new();
        let snapshot = conversation.snapshot();
        conversation.append(Message::user("later"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn reset_yields_fresh_greeting() {
        let mut conversation = Conversation::new();
        let old_greeting = conversation.messages()[0].id;
        conversation.append(Message::user("q"));
        conversation.append(Message::placeholder());

        conversation.reset();

        assert_eq!(conversation.len(), 1);
        let greeting = &conversation.messages()[0];
        assert_eq!(greeting.role, MessageRole::Assistant);
        assert_eq!(greeting.content, GREETING);
        assert_ne!(greeting.id, old_greeting);
    }
}
