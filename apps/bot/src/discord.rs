use std::{mem::take, sync::Arc};

use anyhow::{Result, bail};
use async_trait::async_trait;
use poise::{Framework, FrameworkOptions};
use serenity::all::{
    ChannelId, CreateMessage, EditMessage, FullEvent, GatewayIntents, Http, Message, MessageId,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::{ChatClient, ChatId, ChatUpdate, SentMessage, UserId};
use crate::{Data, Error};

/// Discord rejects message content longer than this many characters.
pub const MESSAGE_LIMIT: usize = 2000;

pub fn intents() -> GatewayIntents {
    GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT
}

/// Poise framework whose only job is to turn gateway messages into
/// [`ChatUpdate`]s on `updates`.
pub fn framework(updates: mpsc::UnboundedSender<ChatUpdate>) -> Framework<Data, Error> {
    Framework::builder()
        .options(FrameworkOptions {
            event_handler: |_serenity_ctx, event, _framework_ctx, data| {
                Box::pin(async move {
                    if let FullEvent::Message { new_message } = event
                        && !new_message.author.bot
                    {
                        forward(data, new_message);
                    }
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |_ctx, ready, _framework| {
            let updates = updates.clone();

            Box::pin(async move {
                info!(
                    "{} [{}] connected successfully!",
                    ready.user.name, ready.user.id
                );
                Ok(Data { updates })
            })
        })
        .build()
}

fn forward(data: &Data, message: &Message) {
    let update = ChatUpdate {
        chat: ChatId(message.channel_id.get()),
        sender: UserId(message.author.id.get()),
        sender_name: message.author.name.clone(),
        text: message.content.clone(),
    };

    debug!(chat = %update.chat, sender = %update.sender, "message received");

    if data.updates.send(update).is_err() {
        warn!("dispatcher is gone, dropping message");
    }
}

#[derive(Clone)]
pub struct DiscordChat {
    http: Arc<Http>,
}

impl DiscordChat {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn channel(chat: ChatId) -> Result<ChannelId> {
    if chat.0 == 0 {
        bail!("channel id 0 is not a valid Discord channel");
    }
    Ok(ChannelId::new(chat.0))
}

#[async_trait]
impl ChatClient for DiscordChat {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<SentMessage> {
        let channel = channel(chat)?;
        let mut last: Option<MessageId> = None;

        for chunk in split_message(text, MESSAGE_LIMIT) {
            let msg = channel
                .send_message(&self.http, CreateMessage::new().content(chunk))
                .await?;
            last = Some(msg.id);
        }

        match last {
            Some(id) => Ok(SentMessage { chat, id: id.get() }),
            None => bail!("refusing to send an empty message"),
        }
    }

    async fn edit_text(&self, message: &SentMessage, text: &str) -> Result<()> {
        if message.id == 0 {
            bail!("message id 0 is not a valid Discord message");
        }
        let channel = channel(message.chat)?;
        let mut chunks = split_message(text, MESSAGE_LIMIT).into_iter();

        let Some(first) = chunks.next() else {
            bail!("refusing to edit to an empty message");
        };

        channel
            .edit_message(
                &self.http,
                MessageId::new(message.id),
                EditMessage::new().content(first),
            )
            .await?;

        for rest in chunks {
            channel
                .send_message(&self.http, CreateMessage::new().content(rest))
                .await?;
        }

        Ok(())
    }
}

/// Split `text` into chunks of at most `limit` characters, preferring line
/// boundaries. Blank chunks are dropped.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for mut line in text.split_inclusive('\n') {
        loop {
            let line_len = line.chars().count();

            if current_len + line_len <= limit {
                current.push_str(line);
                current_len += line_len;
                break;
            }

            if current_len > 0 {
                chunks.push(take(&mut current));
                current_len = 0;
                continue;
            }

            // a single line longer than the limit
            let cut = line
                .char_indices()
                .nth(limit)
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.retain(|c| !c.trim().is_empty());
    chunks
}
