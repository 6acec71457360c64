use crate::{
    message::{ChatMessage, Role},
    state::TurnId,
};

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    message: ChatMessage,
    turn: Option<TurnId>,
}

/// Ordered chat history. Insertion order is display order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        let mut transcript = Self::new();
        transcript.replace_all(messages);
        transcript
    }

    /// Replace everything with `messages`. Turn tags are dropped.
    pub fn replace_all(&mut self, messages: Vec<ChatMessage>) {
        self.entries = messages
            .into_iter()
            .map(|message| Entry { message, turn: None })
            .collect();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(Entry {
            message: ChatMessage::user(content),
            turn: None,
        });
    }

    /// Set the assistant entry produced by `turn` to `content`, appending it if the
    /// turn has no entry yet. Returns `true` when a new entry was appended.
    pub fn update_turn(&mut self, turn: TurnId, content: impl Into<String>) -> bool {
        let content = content.into();
        match self.entries.iter_mut().rev().find(|e| e.turn == Some(turn)) {
            Some(entry) => {
                entry.message.content = content;
                false
            }
            None => {
                self.entries.push(Entry {
                    message: ChatMessage {
                        role: Role::Assistant,
                        content,
                    },
                    turn: Some(turn),
                });
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.entries.last().map(|e| &e.message)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> + '_ {
        self.entries.iter().map(|e| &e.message)
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.iter().cloned().collect()
    }
}
