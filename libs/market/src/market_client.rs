use std::time::Duration;

use anyhow::{Context, Error, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::iss::{self, RatesResponse, SecuritiesResponse};
use crate::snapshot::{
    MarketSnapshot, NewsItem, STUB_EUR_RATE, STUB_INDEX_MOEX, STUB_INDEX_RTS, STUB_USD_RATE,
    StockInfo, stub_news, stub_top_stocks,
};

const DEFAULT_BASE_API: &str = "https://iss.moex.com";
const NEWS_API_URL: &str = "https://newsapi.org/v2/everything";
const NEWS_QUERY: &str = "российский фондовый рынок акции";
const NEWS_PAGE_SIZE: usize = 3;
const TIMEOUT: Duration = Duration::from_secs(10);
const MAIN_BOARD: &str = "TQBR";
const TOP_STOCKS: usize = 5;

/// Anything that can produce a market snapshot.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn snapshot(&self) -> Result<MarketSnapshot>;
}

#[derive(Clone)]
pub struct MarketClient {
    client: Client,
    base_api: String,
    news_api_key: Option<String>,
}

impl MarketClient {
    pub fn new(base_api: String, news_api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .context("failed to build market http client")?;

        Ok(Self {
            client,
            base_api,
            news_api_key,
        })
    }

    /// Create a new MarketClient from environment variables.
    /// Reads the optional MOEX_BASE_URL and NEWS_API_KEY.
    pub fn from_env() -> Result<Self> {
        let base_api =
            std::env::var("MOEX_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_API.to_string());
        let news_api_key = std::env::var("NEWS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(base_api, news_api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_api.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let res = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(res)
    }

    /// Index levels: (IMOEX, RTSI).
    pub async fn fetch_indices(&self) -> Result<(Option<f64>, Option<f64>)> {
        let resp: SecuritiesResponse = self
            .get_json(
                self.url("/iss/engines/stock/markets/index/securities.json"),
                &[("iss.meta", "off"), ("iss.only", "securities,marketdata")],
            )
            .await
            .context("MOEX index request failed")?;

        Ok((
            iss::index_value(&resp, "IMOEX"),
            iss::index_value(&resp, "RTSI"),
        ))
    }

    /// Central bank rates: (USD/RUB, EUR/RUB).
    pub async fn fetch_rates(&self) -> Result<(Option<f64>, Option<f64>)> {
        let resp: RatesResponse = self
            .get_json(
                self.url("/iss/statistics/engines/currency/markets/selt/rates.json"),
                &[("iss.meta", "off")],
            )
            .await
            .context("MOEX currency request failed")?;

        Ok(iss::cbrf_rates(&resp))
    }

    /// Most traded main-board shares, by today's turnover.
    pub async fn fetch_top_stocks(&self) -> Result<Vec<StockInfo>> {
        let resp: SecuritiesResponse = self
            .get_json(
                self.url("/iss/engines/stock/markets/shares/securities.json"),
                &[
                    ("iss.meta", "off"),
                    ("iss.only", "securities,marketdata"),
                    ("sort_column", "VALTODAY"),
                    ("sort_order", "desc"),
                    ("limit", "20"),
                ],
            )
            .await
            .context("MOEX shares request failed")?;

        let stocks = iss::top_shares(&resp, MAIN_BOARD, TOP_STOCKS);
        if stocks.is_empty() {
            bail!("MOEX shares response had no usable {MAIN_BOARD} rows");
        }
        Ok(stocks)
    }

    pub async fn fetch_news(&self, api_key: &str) -> Result<Vec<NewsItem>> {
        let page_size = NEWS_PAGE_SIZE.to_string();
        let resp: NewsResponse = self
            .get_json(
                NEWS_API_URL.to_string(),
                &[
                    ("q", NEWS_QUERY),
                    ("language", "ru"),
                    ("pageSize", &page_size),
                    ("apiKey", api_key),
                ],
            )
            .await
            .context("news request failed")?;

        resp.into_items(Utc::now())
    }

    async fn news_or_stub(&self, now: DateTime<Utc>) -> Vec<NewsItem> {
        let Some(key) = self.news_api_key.as_deref() else {
            return stub_news(now);
        };

        match self.fetch_news(key).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = ?e, "news fetch failed, using stub news");
                stub_news(now)
            }
        }
    }
}

#[async_trait]
impl MarketSource for MarketClient {
    /// Every source is fetched independently; whatever fails is stub-filled.
    async fn snapshot(&self) -> Result<MarketSnapshot> {
        let now = Utc::now();

        let (indices, rates, stocks) = tokio::join!(
            self.fetch_indices(),
            self.fetch_rates(),
            self.fetch_top_stocks()
        );

        let (moex, rts) = indices.unwrap_or_else(|e| {
            warn!(error = ?e, "index fetch failed, using stub indices");
            (None, None)
        });
        let (usd, eur) = rates.unwrap_or_else(|e| {
            warn!(error = ?e, "currency fetch failed, using stub rates");
            (None, None)
        });
        let top_stocks = stocks.unwrap_or_else(|e| {
            warn!(error = ?e, "top stocks fetch failed, using stub stocks");
            stub_top_stocks()
        });
        let news = self.news_or_stub(now).await;

        debug!(?moex, ?rts, ?usd, ?eur, stocks = top_stocks.len(), "market fields fetched");

        let snapshot = MarketSnapshot::assemble(
            moex.unwrap_or(STUB_INDEX_MOEX),
            rts.unwrap_or(STUB_INDEX_RTS),
            usd.unwrap_or(STUB_USD_RATE),
            eur.unwrap_or(STUB_EUR_RATE),
            top_stocks,
            news,
        );

        info!(
            index_moex = snapshot.index_moex,
            trend = ?snapshot.trend,
            recommended = %snapshot.recommended.ticker,
            "market snapshot ready"
        );

        Ok(snapshot)
    }
}

//
// Match NewsAPI JSON
// https://newsapi.org/docs/endpoints/everything
//
#[derive(Debug, Deserialize, Clone)]
pub struct NewsResponse {
    pub status: String,
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Article {
    pub title: String,
    pub source: ArticleSource,
    pub url: String,

    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArticleSource {
    pub name: Option<String>,
}

impl NewsResponse {
    /// Articles as news items; unparsable publish times read as `now`.
    pub fn into_items(self, now: DateTime<Utc>) -> Result<Vec<NewsItem>> {
        if self.status != "ok" || self.articles.is_empty() {
            bail!("unexpected news response (status={})", self.status);
        }

        Ok(self
            .articles
            .into_iter()
            .map(|a| NewsItem {
                timestamp: a
                    .published_at
                    .as_deref()
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or(now),
                title: a.title,
                source: a.source.name.unwrap_or_default(),
                url: a.url,
            })
            .collect())
    }
}
