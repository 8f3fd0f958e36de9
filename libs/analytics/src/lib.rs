mod completion;
mod error;
mod prompt;
mod service;

use async_trait::async_trait;

pub use completion::{CompletionClient, CompletionConfig};
pub use error::CompletionError;
pub use service::AnalyticsService;

/// Producer of the analytics text that gets sent to users.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn generate_analytics(&self) -> anyhow::Result<String>;
}
