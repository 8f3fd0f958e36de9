//! Dispatcher behaviour against in-memory chat and analytics fakes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use analytics::AnalyticsSource;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use bot::chat::{ChatClient, ChatId, ChatUpdate, SentMessage, UserId};
use bot::command;
use bot::dispatcher::Dispatcher;
use bot::scheduler::{ScheduleSpec, WakeSignal};
use market::MarketZone;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const ADMIN: UserId = UserId(100);
const ADMIN_CHAT: ChatId = ChatId(500);
const STRANGER: UserId = UserId(200);
const STRANGER_CHAT: ChatId = ChatId(600);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Sent { chat: ChatId, id: u64, text: String },
    Edited { chat: ChatId, id: u64, text: String },
}

#[derive(Clone, Default)]
struct FakeChat {
    events: Arc<Mutex<Vec<Event>>>,
    failing: Arc<Mutex<HashSet<ChatId>>>,
    next_id: Arc<AtomicU64>,
}

impl FakeChat {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn fail_sends_to(&self, chat: ChatId) {
        self.failing.lock().unwrap().insert(chat);
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<SentMessage> {
        if self.failing.lock().unwrap().contains(&chat) {
            bail!("chat {chat} is unreachable");
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().unwrap().push(Event::Sent {
            chat,
            id,
            text: text.to_string(),
        });
        Ok(SentMessage { chat, id })
    }

    async fn edit_text(&self, message: &SentMessage, text: &str) -> Result<()> {
        self.events.lock().unwrap().push(Event::Edited {
            chat: message.chat,
            id: message.id,
            text: text.to_string(),
        });
        Ok(())
    }
}

#[derive(Clone)]
struct FakeAnalytics {
    reply: Option<&'static str>,
    calls: Arc<AtomicUsize>,
}

impl FakeAnalytics {
    fn ok(text: &'static str) -> Self {
        Self {
            reply: Some(text),
            calls: Arc::default(),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyticsSource for FakeAnalytics {
    async fn generate_analytics(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .map(str::to_string)
            .ok_or_else(|| anyhow!("completion endpoint unavailable"))
    }
}

fn schedule() -> ScheduleSpec {
    ScheduleSpec::new(10, 0, MarketZone::moscow()).unwrap()
}

fn dispatcher(chat: &FakeChat, analytics: &FakeAnalytics) -> Dispatcher<FakeChat, FakeAnalytics> {
    Dispatcher::new(chat.clone(), analytics.clone(), ADMIN, schedule())
}

fn message(chat: ChatId, sender: UserId, text: &str) -> ChatUpdate {
    ChatUpdate {
        chat,
        sender,
        sender_name: format!("user{}", sender.0),
        text: text.to_string(),
    }
}

fn sent(chat: ChatId, id: u64, text: &str) -> Event {
    Event::Sent {
        chat,
        id,
        text: text.to_string(),
    }
}

async fn wait_for_events(chat: &FakeChat, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while chat.events().len() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for chat events");
}

#[tokio::test]
async fn admin_subscribes_then_receives_the_daily_text() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let (wake_tx, wake_rx) = mpsc::channel(1);

    let task = tokio::spawn(dispatcher(&chat, &analytics).run(
        update_rx,
        wake_rx,
        CancellationToken::new(),
    ));

    update_tx
        .send(message(ADMIN_CHAT, ADMIN, "/subscribe"))
        .unwrap();
    wait_for_events(&chat, 1).await;

    wake_tx.send(WakeSignal).await.unwrap();
    wait_for_events(&chat, 2).await;

    drop(update_tx);
    drop(wake_tx);
    let dispatcher = task.await.unwrap();

    assert_eq!(dispatcher.subscribers().snapshot(), vec![ADMIN_CHAT]);
    assert_eq!(
        chat.events(),
        vec![
            sent(ADMIN_CHAT, 1, &command::subscribed_text(&schedule())),
            sent(ADMIN_CHAT, 2, "TEXT"),
        ]
    );
    assert_eq!(analytics.calls(), 1);
}

#[tokio::test]
async fn stranger_cannot_subscribe() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let mut d = dispatcher(&chat, &analytics);

    d.handle_update(message(STRANGER_CHAT, STRANGER, "/subscribe"))
        .await;

    assert!(d.subscribers().is_empty());
    assert_eq!(
        chat.events(),
        vec![sent(STRANGER_CHAT, 1, command::ADMIN_ONLY)]
    );
}

#[tokio::test]
async fn stranger_is_refused_every_gated_command() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let mut d = dispatcher(&chat, &analytics);

    for text in ["/unsubscribe", "/analytics", "/subscribe@bot"] {
        d.handle_update(message(STRANGER_CHAT, STRANGER, text)).await;
    }

    let events = chat.events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| matches!(
        e,
        Event::Sent { chat, text, .. } if *chat == STRANGER_CHAT && text == command::ADMIN_ONLY
    )));
    assert_eq!(analytics.calls(), 0);
}

#[tokio::test]
async fn failing_analytics_edits_placeholder_to_error_text() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::failing();
    let mut d = dispatcher(&chat, &analytics);
    d.handle_update(message(ADMIN_CHAT, ADMIN, "/subscribe")).await;
    let before = d.subscribers().snapshot();

    d.handle_update(message(ADMIN_CHAT, ADMIN, "/analytics")).await;

    assert_eq!(
        chat.events()[1..],
        [
            sent(ADMIN_CHAT, 2, command::GENERATING),
            Event::Edited {
                chat: ADMIN_CHAT,
                id: 2,
                text: command::ANALYTICS_FAILED.to_string(),
            },
        ]
    );
    assert_eq!(d.subscribers().snapshot(), before);
    assert_eq!(analytics.calls(), 1);
}

#[tokio::test]
async fn analytics_replaces_placeholder_with_result() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("today: buy GAZP");
    let mut d = dispatcher(&chat, &analytics);

    d.handle_update(message(ADMIN_CHAT, ADMIN, "/analytics")).await;

    assert_eq!(
        chat.events(),
        vec![
            sent(ADMIN_CHAT, 1, command::GENERATING),
            Event::Edited {
                chat: ADMIN_CHAT,
                id: 1,
                text: "today: buy GAZP".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn analytics_without_placeholder_is_sent_fresh() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let mut d = dispatcher(&chat, &analytics);
    chat.fail_sends_to(ADMIN_CHAT);

    d.handle_update(message(ADMIN_CHAT, ADMIN, "/analytics")).await;

    // Both the placeholder and the fresh send hit the failing chat.
    assert!(chat.events().is_empty());
    assert_eq!(analytics.calls(), 1);
}

#[tokio::test]
async fn subscribe_and_unsubscribe_are_idempotent() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let mut d = dispatcher(&chat, &analytics);

    d.handle_update(message(ADMIN_CHAT, ADMIN, "/subscribe")).await;
    d.handle_update(message(ADMIN_CHAT, ADMIN, "/subscribe")).await;
    assert_eq!(d.subscribers().len(), 1);

    d.handle_update(message(ADMIN_CHAT, ADMIN, "/unsubscribe")).await;
    d.handle_update(message(ADMIN_CHAT, ADMIN, "/unsubscribe")).await;
    assert!(d.subscribers().is_empty());

    let events = chat.events();
    assert_eq!(events.len(), 4);
    assert_eq!(events[3], sent(ADMIN_CHAT, 4, command::UNSUBSCRIBED));
}

#[tokio::test]
async fn start_is_open_to_everyone() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let mut d = dispatcher(&chat, &analytics);

    d.handle_update(message(STRANGER_CHAT, STRANGER, "/start")).await;
    d.handle_update(message(ADMIN_CHAT, ADMIN, "/start")).await;

    assert_eq!(
        chat.events(),
        vec![
            sent(STRANGER_CHAT, 1, &command::start_text(&schedule(), false)),
            sent(ADMIN_CHAT, 2, &command::start_text(&schedule(), true)),
        ]
    );
    assert!(command::start_text(&schedule(), false).contains("10:00 (Europe/Moscow)"));
    assert!(command::start_text(&schedule(), true).contains("administrator"));
}

#[tokio::test]
async fn non_commands_are_ignored() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let mut d = dispatcher(&chat, &analytics);

    for text in ["hello", "", "/help", "subscribe", "/Subscribe"] {
        d.handle_update(message(ADMIN_CHAT, ADMIN, text)).await;
    }

    assert!(chat.events().is_empty());
    assert!(d.subscribers().is_empty());
}

#[tokio::test]
async fn broadcast_generates_once_and_survives_a_failed_recipient() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let mut d = dispatcher(&chat, &analytics);

    for id in [1, 2, 3] {
        d.handle_update(message(ChatId(id), ADMIN, "/subscribe")).await;
    }
    chat.fail_sends_to(ChatId(2));

    let report = d.broadcast().await.unwrap();

    assert_eq!(report.recipients, 3);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(analytics.calls(), 1);
    assert_eq!(d.subscribers().len(), 3);

    let mut delivered: Vec<ChatId> = chat.events()[3..]
        .iter()
        .map(|e| match e {
            Event::Sent { chat, text, .. } => {
                assert_eq!(text, "TEXT");
                *chat
            }
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    delivered.sort_by_key(|c| c.0);
    assert_eq!(delivered, vec![ChatId(1), ChatId(3)]);
}

#[tokio::test]
async fn failed_generation_skips_the_broadcast() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::failing();
    let mut d = dispatcher(&chat, &analytics);
    d.handle_update(message(ADMIN_CHAT, ADMIN, "/subscribe")).await;

    assert!(d.broadcast().await.is_none());
    assert_eq!(chat.events().len(), 1);
    assert_eq!(d.subscribers().len(), 1);
}

#[tokio::test]
async fn broadcast_with_no_subscribers_sends_nothing() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let d = dispatcher(&chat, &analytics);

    let report = d.broadcast().await.unwrap();
    assert_eq!(report.recipients, 0);
    assert!(chat.events().is_empty());
}

#[tokio::test]
async fn cancellation_stops_the_loop_with_inputs_open() {
    let chat = FakeChat::default();
    let analytics = FakeAnalytics::ok("TEXT");
    let (_update_tx, update_rx) = mpsc::unbounded_channel::<ChatUpdate>();
    let (_wake_tx, wake_rx) = mpsc::channel::<WakeSignal>(1);
    let cancel = CancellationToken::new();

    let task = tokio::spawn(dispatcher(&chat, &analytics).run(update_rx, wake_rx, cancel.clone()));
    cancel.cancel();

    let d = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("dispatcher did not stop")
        .unwrap();
    assert!(d.subscribers().is_empty());
}
