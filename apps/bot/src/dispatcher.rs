use analytics::AnalyticsSource;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::chat::{ChatClient, ChatId, ChatUpdate, UserId};
use crate::command::{self, Command};
use crate::daily::{self, BroadcastReport};
use crate::registry::SubscriberSet;
use crate::scheduler::{ScheduleSpec, WakeSignal};

/// Single consumer of chat updates and wake signals.
///
/// Events are handled one at a time, so the subscriber set it owns is never
/// touched concurrently. A slow analytics call delays the next update.
pub struct Dispatcher<C, A> {
    chat: C,
    analytics: A,
    admin: UserId,
    schedule: ScheduleSpec,
    subscribers: SubscriberSet,
}

impl<C, A> Dispatcher<C, A>
where
    C: ChatClient,
    A: AnalyticsSource,
{
    pub fn new(chat: C, analytics: A, admin: UserId, schedule: ScheduleSpec) -> Self {
        Self {
            chat,
            analytics,
            admin,
            schedule,
            subscribers: SubscriberSet::new(),
        }
    }

    pub fn subscribers(&self) -> &SubscriberSet {
        &self.subscribers
    }

    /// Serve both inputs until cancelled or until both are closed.
    pub async fn run(
        mut self,
        mut updates: mpsc::UnboundedReceiver<ChatUpdate>,
        mut wake: mpsc::Receiver<WakeSignal>,
        cancel: CancellationToken,
    ) -> Self {
        let mut updates_open = true;
        let mut wake_open = true;

        info!(admin = %self.admin, schedule = %self.schedule, "dispatcher started");

        while updates_open || wake_open {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("dispatcher cancelled");
                    break;
                }
                update = updates.recv(), if updates_open => match update {
                    Some(update) => self.handle_update(update).await,
                    None => {
                        warn!("chat update stream closed");
                        updates_open = false;
                    }
                },
                signal = wake.recv(), if wake_open => match signal {
                    Some(WakeSignal) => {
                        self.broadcast().await;
                    }
                    None => {
                        warn!("wake signal stream closed");
                        wake_open = false;
                    }
                },
            }
        }

        info!(subscribers = self.subscribers.len(), "dispatcher stopped");
        self
    }

    pub async fn handle_update(&mut self, update: ChatUpdate) {
        let Some(command) = Command::parse(&update.text) else {
            debug!(chat = %update.chat, sender = %update.sender, "ignoring non-command message");
            return;
        };

        let chat = update.chat;
        let is_admin = update.sender == self.admin;

        info!(
            user = %update.sender_name,
            sender = %update.sender,
            chat = %chat,
            command = command.name(),
            is_admin,
            "command received"
        );

        if command.admin_only() && !is_admin {
            warn!(sender = %update.sender, command = command.name(), "command refused");
            self.reply(chat, command::ADMIN_ONLY).await;
            return;
        }

        match command {
            Command::Start => {
                self.reply(chat, &command::start_text(&self.schedule, is_admin))
                    .await;
            }
            Command::Subscribe => {
                let added = self.subscribers.subscribe(chat);
                info!(chat = %chat, added, total = self.subscribers.len(), "subscribed");
                self.reply(chat, &command::subscribed_text(&self.schedule))
                    .await;
            }
            Command::Unsubscribe => {
                let removed = self.subscribers.unsubscribe(chat);
                info!(chat = %chat, removed, total = self.subscribers.len(), "unsubscribed");
                self.reply(chat, command::UNSUBSCRIBED).await;
            }
            Command::Analytics => self.analytics_now(chat).await,
        }
    }

    /// Today's broadcast to everyone subscribed right now.
    ///
    /// Returns `None` when the analytics could not be generated.
    pub async fn broadcast(&self) -> Option<BroadcastReport> {
        let recipients = self.subscribers.snapshot();
        info!(recipients = recipients.len(), "daily broadcast triggered");

        match daily::run_daily(&self.chat, &self.analytics, recipients).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = ?e, "daily broadcast skipped");
                None
            }
        }
    }

    async fn analytics_now(&self, chat: ChatId) {
        let placeholder = match self.chat.send_text(chat, command::GENERATING).await {
            Ok(sent) => Some(sent),
            Err(e) => {
                warn!(chat = %chat, error = ?e, "placeholder send failed");
                None
            }
        };

        let body = match self.analytics.generate_analytics().await {
            Ok(text) => text,
            Err(e) => {
                error!(chat = %chat, error = ?e, "analytics generation failed");
                command::ANALYTICS_FAILED.to_string()
            }
        };

        let delivered = match placeholder {
            Some(sent) => self.chat.edit_text(&sent, &body).await,
            None => self.chat.send_text(chat, &body).await.map(|_| ()),
        };

        if let Err(e) = delivered {
            warn!(chat = %chat, error = ?e, "analytics delivery failed");
        }
    }

    async fn reply(&self, chat: ChatId, text: &str) {
        if let Err(e) = self.chat.send_text(chat, text).await {
            warn!(chat = %chat, error = ?e, "reply failed");
        }
    }
}
