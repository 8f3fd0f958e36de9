use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

/// Destination of outbound messages (a Discord channel id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub u64);

/// Author of an inbound message (a Discord user id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

/// A message the bot has already sent, so it can be edited later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SentMessage {
    pub chat: ChatId,
    pub id: u64,
}

/// One inbound message from the chat platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatUpdate {
    pub chat: ChatId,
    pub sender: UserId,
    pub sender_name: String,
    pub text: String,
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two outbound operations the dispatcher needs from a chat platform.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<SentMessage>;

    async fn edit_text(&self, message: &SentMessage, text: &str) -> Result<()>;
}
