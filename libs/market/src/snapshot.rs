use std::fmt::Write as _;

use chrono::{DateTime, Duration, Utc};

pub const STUB_INDEX_MOEX: f64 = 4100.0;
pub const STUB_INDEX_RTS: f64 = 1100.0;
pub const STUB_USD_RATE: f64 = 90.5;
pub const STUB_EUR_RATE: f64 = 98.7;

/// IMOEX levels separating the trend buckets.
const TREND_UP_ABOVE: f64 = 4200.0;
const TREND_DOWN_BELOW: f64 = 3800.0;

/// Best-effort read of the market. Any field may hold a stub value.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub index_moex: f64,
    pub index_rts: f64,
    pub usd_rate: f64,
    pub eur_rate: f64,
    pub top_stocks: Vec<StockInfo>,
    pub recommended: StockInfo,
    pub trend: Trend,
    pub news: Vec<NewsItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockInfo {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    /// Percent change against the previous close.
    pub change: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub source: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn from_index(index_moex: f64) -> Self {
        if index_moex > TREND_UP_ABOVE {
            Trend::Up
        } else if index_moex < TREND_DOWN_BELOW {
            Trend::Down
        } else {
            Trend::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Trend::Up => "RISING 📈",
            Trend::Down => "FALLING 📉",
            Trend::Stable => "STABLE ↔️",
        }
    }
}

impl StockInfo {
    fn rub(ticker: &str, name: &str, price: f64, change: f64) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
            price,
            change,
            currency: "RUB".to_string(),
        }
    }

    fn signed_change(&self) -> String {
        if self.change > 0.0 {
            format!("+{:.2}%", self.change)
        } else {
            format!("{:.2}%", self.change)
        }
    }
}

pub fn stub_top_stocks() -> Vec<StockInfo> {
    vec![
        StockInfo::rub("GAZP", "Gazprom", 164.82, 0.63),
        StockInfo::rub("SBER", "Sberbank", 287.45, 1.12),
        StockInfo::rub("LKOH", "Lukoil", 7046.5, -0.35),
    ]
}

pub fn stub_recommendation() -> StockInfo {
    StockInfo::rub("GAZP", "Gazprom", 164.82, 0.63)
}

pub fn stub_news(now: DateTime<Utc>) -> Vec<NewsItem> {
    vec![
        NewsItem {
            title: "MOEX index: today's outlook".to_string(),
            source: "RBC".to_string(),
            url: "https://www.rbc.ru/finances/".to_string(),
            timestamp: now - Duration::hours(2),
        },
        NewsItem {
            title: "Which Russian stocks keep growing in current conditions".to_string(),
            source: "Vedomosti".to_string(),
            url: "https://www.vedomosti.ru/finance/".to_string(),
            timestamp: now - Duration::hours(5),
        },
        NewsItem {
            title: "Ruble rate: drivers and near-term outlook".to_string(),
            source: "Kommersant".to_string(),
            url: "https://www.kommersant.ru/finance/".to_string(),
            timestamp: now - Duration::hours(24),
        },
    ]
}

/// The stock with the greatest change; the first one wins ties.
pub fn pick_recommendation(stocks: &[StockInfo]) -> StockInfo {
    stocks
        .iter()
        .fold(None::<&StockInfo>, |best, s| match best {
            Some(b) if b.change >= s.change => Some(b),
            _ => Some(s),
        })
        .cloned()
        .unwrap_or_else(stub_recommendation)
}

impl MarketSnapshot {
    /// Snapshot made entirely of stub values.
    pub fn stub(now: DateTime<Utc>) -> Self {
        Self::assemble(
            STUB_INDEX_MOEX,
            STUB_INDEX_RTS,
            STUB_USD_RATE,
            STUB_EUR_RATE,
            stub_top_stocks(),
            stub_news(now),
        )
    }

    pub fn assemble(
        index_moex: f64,
        index_rts: f64,
        usd_rate: f64,
        eur_rate: f64,
        top_stocks: Vec<StockInfo>,
        news: Vec<NewsItem>,
    ) -> Self {
        let recommended = pick_recommendation(&top_stocks);
        Self {
            index_moex,
            index_rts,
            usd_rate,
            eur_rate,
            trend: Trend::from_index(index_moex),
            top_stocks,
            recommended,
            news,
        }
    }

    /// Render the snapshot as the market context block of a prompt.
    pub fn format_for_prompt(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "📊 INDICES:");
        let _ = writeln!(out, "- MOEX index: {:.2}", self.index_moex);
        let _ = writeln!(out, "- RTS index: {:.2}", self.index_rts);
        let _ = writeln!(out, "- USD/RUB: {:.2}", self.usd_rate);
        let _ = writeln!(out, "- EUR/RUB: {:.2}\n", self.eur_rate);

        let _ = writeln!(out, "🔍 MARKET TREND: {}\n", self.trend.label());

        let _ = writeln!(out, "🏆 TOP STOCKS:");
        for s in &self.top_stocks {
            let _ = writeln!(
                out,
                "- {} ({}): {:.2} {} ({})",
                s.name,
                s.ticker,
                s.price,
                s.currency,
                s.signed_change()
            );
        }
        out.push('\n');

        let r = &self.recommended;
        let _ = writeln!(out, "💎 RECOMMENDATION:");
        let _ = writeln!(
            out,
            "- {} ({}): {:.2} {} (change: {:.2}%)\n",
            r.name, r.ticker, r.price, r.currency, r.change
        );

        let _ = writeln!(out, "📰 LATEST NEWS:");
        for n in &self.news {
            let _ = writeln!(
                out,
                "- {} (Source: {}, {})",
                n.title,
                n.source,
                n.timestamp.format("%d.%m.%Y")
            );
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn trend_thresholds() {
        assert_eq!(Trend::from_index(4200.01), Trend::Up);
        assert_eq!(Trend::from_index(4200.0), Trend::Stable);
        assert_eq!(Trend::from_index(3800.0), Trend::Stable);
        assert_eq!(Trend::from_index(3799.9), Trend::Down);
    }

    #[test]
    fn recommendation_is_biggest_gainer() {
        let best = pick_recommendation(&stub_top_stocks());
        assert_eq!(best.ticker, "SBER");
    }

    #[test]
    fn recommendation_falls_back_to_stub() {
        assert_eq!(pick_recommendation(&[]), stub_recommendation());
    }

    #[test]
    fn prompt_block_lists_every_section() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let text = MarketSnapshot::stub(now).format_for_prompt();

        assert!(text.contains("- MOEX index: 4100.00"));
        assert!(text.contains("- USD/RUB: 90.50"));
        assert!(text.contains("MARKET TREND: STABLE"));
        assert!(text.contains("- Sberbank (SBER): 287.45 RUB (+1.12%)"));
        assert!(text.contains("- Lukoil (LKOH): 7046.50 RUB (-0.35%)"));
        assert!(text.contains("- Sberbank (SBER): 287.45 RUB (change: 1.12%)"));
        assert!(text.contains("(Source: Kommersant, 09.03.2026)"));
    }
}
