//! In-session conversation log and request payload derivation

use chrono::{DateTime, Local, Utc};
use uuid::Uuid;

use crate::completion::{ChatMessage, Role};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Request role for this sender
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::User => Role::User,
            Self::Assistant => Role::Assistant,
        }
    }
}

/// A message in the conversation; immutable once appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(sender: Sender, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text,
            created_at: Utc::now(),
        }
    }

    /// Local wall-clock time for display, `HH:MM`
    #[must_use]
    pub fn display_time(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string()
    }

    /// Request form of this message
    #[must_use]
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.sender.role(), self.text.clone())
    }
}

/// Ordered, append-only message log for one session
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Append a message; text is stored as given
    pub fn append(&mut self, sender: Sender, text: impl Into<String>) -> Message {
        let message = Message::new(sender, text.into());
        self.messages.push(message.clone());
        message
    }

    /// Request messages in insertion order
    ///
    /// Borrows the history, so it can be re-derived any number of times.
    pub fn to_request_messages(&self) -> impl Iterator<Item = ChatMessage> + '_ {
        self.messages.iter().map(Message::to_chat_message)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Build a request payload: optional preamble, the full history, then the new message
///
/// History is replayed as-is; no role alternation is enforced.
#[must_use]
pub fn build_payload(
    preamble: Option<&str>,
    history: &ConversationHistory,
    new_message: &str,
) -> Vec<ChatMessage> {
    preamble
        .map(ChatMessage::system)
        .into_iter()
        .chain(history.to_request_messages())
        .chain(std::iter::once(ChatMessage::user(new_message)))
        .collect()
}
