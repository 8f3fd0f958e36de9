use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Wall-clock zone the market (and the daily schedule) lives in.
///
/// A named zone comes from the compiled-in tz database. When the name cannot
/// be resolved the zone degrades to a fixed UTC offset instead of failing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarketZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl MarketZone {
    /// `Europe/Moscow`.
    pub fn moscow() -> Self {
        MarketZone::Named(chrono_tz::Europe::Moscow)
    }

    pub fn fixed_hours(hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(hours * 3600)
            .with_context(|| format!("invalid UTC offset: {hours}h"))?;
        Ok(MarketZone::Fixed(offset))
    }

    /// Resolve a tz database name, degrading to `fallback_hours` east of UTC.
    pub fn resolve(name: &str, fallback_hours: i32) -> Result<Self> {
        match name.trim().parse::<Tz>() {
            Ok(tz) => Ok(MarketZone::Named(tz)),
            Err(e) => {
                warn!(
                    zone = name,
                    fallback_hours,
                    error = %e,
                    "unknown time zone, using fixed offset"
                );
                Self::fixed_hours(fallback_hours)
            }
        }
    }

    /// Wall-clock reading of `instant` in this zone.
    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            MarketZone::Named(tz) => instant.with_timezone(tz).naive_local(),
            MarketZone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }

    pub fn today(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date()
    }

    /// The instant a local wall-clock reading refers to.
    ///
    /// Ambiguous readings resolve to the earlier instant; readings inside a
    /// gap are pushed forward by one hour.
    pub fn instant(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self {
            MarketZone::Named(tz) => resolve_local(tz, local),
            MarketZone::Fixed(offset) => resolve_local(offset, local),
        }
    }
}

fn resolve_local<Z: TimeZone>(zone: &Z, local: NaiveDateTime) -> DateTime<Utc> {
    zone.from_local_datetime(&local)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

impl fmt::Display for MarketZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketZone::Named(tz) => write!(f, "{}", tz.name()),
            MarketZone::Fixed(offset) => write!(f, "UTC{offset}"),
        }
    }
}
