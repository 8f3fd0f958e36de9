use std::time::Duration;

use anyhow::Context;
use reqwest::{StatusCode, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CompletionError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Chat-completions endpoint settings.
///
/// A missing `api_key` means no remote calls are made at all.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    /// Offer the model a `retrieval` tool with `tool_choice = auto`.
    pub retrieval_tool: bool,
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            retrieval_tool: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl CompletionConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let api_key = std::env::var("AI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let base_url = std::env::var("AI_API_BASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.base_url);
        let model = std::env::var("AI_MODEL_NAME")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.model);

        let temperature = match std::env::var("AI_TEMPERATURE") {
            Ok(s) => s.parse().context("AI_TEMPERATURE must be a number")?,
            Err(_) => defaults.temperature,
        };
        let retrieval_tool = match std::env::var("AI_RETRIEVAL_TOOL") {
            Ok(s) => s.parse().context("AI_RETRIEVAL_TOOL must be true or false")?,
            Err(_) => defaults.retrieval_tool,
        };
        let timeout = match std::env::var("AI_TIMEOUT_SECS") {
            Ok(s) => Duration::from_secs(s.parse().context("AI_TIMEOUT_SECS must be seconds")?),
            Err(_) => defaults.timeout,
        };

        Ok(Self {
            api_key,
            base_url,
            model,
            temperature,
            retrieval_tool,
            timeout,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Tool {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build completion http client")?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub(crate) fn request<'a>(&'a self, system: &'a str, user: &'a str) -> ChatRequest<'a> {
        let (tools, tool_choice) = if self.config.retrieval_tool {
            (vec![Tool { kind: "retrieval" }], Some("auto"))
        } else {
            (Vec::new(), None)
        };

        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            tools,
            tool_choice,
        }
    }

    /// Send one system + user exchange and return the reply text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(CompletionError::Api("no API key configured".to_string()));
        };

        let res = self
            .http
            .post(&self.config.base_url)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&self.request(system, user))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        debug!(%status, bytes = body.len(), "completion response received");

        parse_response(status, &body)
    }
}

fn parse_response(status: StatusCode, body: &str) -> Result<String, CompletionError> {
    let parsed: ChatResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) if !status.is_success() => {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: body.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(err) = parsed.error {
        return Err(CompletionError::Api(err.message));
    }
    if !status.is_success() {
        return Err(CompletionError::Status {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(CompletionError::Empty)
}
