use analytics::AnalyticsSource;
use anyhow::{Context, Result};
use serenity::futures::{StreamExt, stream};
use tracing::{debug, info, instrument, warn};
use tracing_futures::Instrument;

use crate::chat::{ChatClient, ChatId};

const CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Generate the analytics once and fan it out to `recipients`.
///
/// A failed generation skips the whole broadcast. A failed delivery is
/// logged and counted; the other recipients still get the message.
#[instrument(
    name = "run_daily",
    skip(chat, analytics, recipients),
    fields(recipients = recipients.len())
)]
pub async fn run_daily<C, A>(
    chat: &C,
    analytics: &A,
    recipients: Vec<ChatId>,
) -> Result<BroadcastReport>
where
    C: ChatClient + ?Sized,
    A: AnalyticsSource + ?Sized,
{
    let text = analytics
        .generate_analytics()
        .await
        .context("daily analytics generation failed")?;
    let text = text.as_str();

    info!(chars = text.chars().count(), "analytics generated, delivering");

    let mut report = BroadcastReport {
        recipients: recipients.len(),
        ..Default::default()
    };

    let mut deliveries = stream::iter(recipients)
        .map(|recipient| {
            let span = tracing::info_span!("daily_recipient", chat = %recipient);

            async move {
                match chat.send_text(recipient, text).await {
                    Ok(_) => {
                        debug!("delivered");
                        true
                    }
                    Err(e) => {
                        warn!(error = ?e, "delivery failed");
                        false
                    }
                }
            }
            .instrument(span)
        })
        .buffer_unordered(CONCURRENCY);

    while let Some(ok) = deliveries.next().await {
        if ok {
            report.delivered += 1;
        } else {
            report.failed += 1;
        }
    }

    info!(
        recipients = report.recipients,
        delivered = report.delivered,
        failed = report.failed,
        "completed daily broadcast"
    );

    Ok(report)
}
