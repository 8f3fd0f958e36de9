use std::{env::var, fmt::Display, str::FromStr};

use anyhow::{Context, Result, anyhow};
use market::MarketZone;

use crate::chat::UserId;
use crate::scheduler::ScheduleSpec;

const DEFAULT_TIMEZONE: &str = "Europe/Moscow";

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub admin: UserId,
    pub schedule: ScheduleSpec,
    pub version: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let discord_token = var("DISCORD_TOKEN").context("DISCORD_TOKEN not set")?;
        let admin = UserId(parse_var("ADMIN_USER_ID")?.context("ADMIN_USER_ID not set")?);

        let hour = parse_var("DAILY_HOUR")?.unwrap_or(10);
        let minute = parse_var("DAILY_MINUTE")?.unwrap_or(0);
        let fallback_hours = parse_var("DAILY_FALLBACK_UTC_OFFSET_HOURS")?.unwrap_or(3);
        let zone_name = var("DAILY_TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let zone = MarketZone::resolve(&zone_name, fallback_hours)?;

        Ok(Self {
            discord_token,
            admin,
            schedule: ScheduleSpec::new(hour, minute, zone)?,
            version: var("APP_VERSION").unwrap_or_else(|_| "Unknown".to_string()),
        })
    }

    pub fn zone(&self) -> MarketZone {
        self.schedule.zone()
    }
}

/// `Ok(None)` when unset, an error when set but unparsable.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{name}={raw:?} is invalid: {e}")),
        Err(_) => Ok(None),
    }
}
