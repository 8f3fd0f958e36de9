use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use market::{MarketSource, MarketZone};
use tracing::{info, instrument, warn};

use crate::AnalyticsSource;
use crate::completion::{CompletionClient, CompletionConfig};
use crate::prompt::{self, MARKET_DATA_UNAVAILABLE};

/// Market snapshot + prompt + completion call, or the canned local text
/// when no credential is configured.
#[derive(Clone)]
pub struct AnalyticsService {
    completion: CompletionClient,
    market: Arc<dyn MarketSource>,
    zone: MarketZone,
}

impl AnalyticsService {
    pub fn new(
        config: CompletionConfig,
        market: Arc<dyn MarketSource>,
        zone: MarketZone,
    ) -> Result<Self> {
        if config.api_key.is_none() {
            warn!("AI_API_KEY is not set, analytics will use the local fallback text");
        }

        Ok(Self {
            completion: CompletionClient::new(config)?,
            market,
            zone,
        })
    }

    pub fn from_env(market: Arc<dyn MarketSource>, zone: MarketZone) -> Result<Self> {
        Self::new(CompletionConfig::from_env()?, market, zone)
    }

    pub fn is_local(&self) -> bool {
        self.completion.config().api_key.is_none()
    }

    async fn market_context(&self) -> String {
        match self.market.snapshot().await {
            Ok(snapshot) => snapshot.format_for_prompt(),
            Err(e) => {
                warn!(error = ?e, "market snapshot failed, prompting without data");
                MARKET_DATA_UNAVAILABLE.to_string()
            }
        }
    }
}

#[async_trait]
impl AnalyticsSource for AnalyticsService {
    #[instrument(
        name = "generate_analytics",
        skip(self),
        fields(model = %self.completion.config().model)
    )]
    async fn generate_analytics(&self) -> Result<String> {
        let today = self.zone.today(Utc::now());

        if self.is_local() {
            info!(%today, "serving local analytics");
            return Ok(prompt::local_analytics(today));
        }

        let context = self.market_context().await;
        let text = self
            .completion
            .complete(&prompt::system_prompt(), &prompt::user_prompt(today, &context))
            .await?;

        info!(chars = text.chars().count(), "analytics generated");
        Ok(text)
    }
}
