mod market_client;
mod snapshot;
mod zone;

pub mod iss;

pub use market_client::{MarketClient, MarketSource};
pub use snapshot::{MarketSnapshot, NewsItem, StockInfo, Trend};
pub use zone::MarketZone;
