use std::collections::HashSet;

use crate::chat::ChatId;

/// Chats receiving the daily broadcast.
///
/// Memory only: empty at startup and lost on exit. Owned by the dispatcher,
/// which is the only place it is read or written.
#[derive(Debug, Default, Clone)]
pub struct SubscriberSet {
    chats: HashSet<ChatId>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a chat
    /// Returns true if it was newly added
    pub fn subscribe(&mut self, chat: ChatId) -> bool {
        self.chats.insert(chat)
    }

    /// Unsubscribe a chat
    /// Returns true if it existed
    pub fn unsubscribe(&mut self, chat: ChatId) -> bool {
        self.chats.remove(&chat)
    }

    pub fn contains(&self, chat: ChatId) -> bool {
        self.chats.contains(&chat)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Point-in-time copy of the recipients.
    pub fn snapshot(&self) -> Vec<ChatId> {
        self.chats.iter().copied().collect()
    }
}
