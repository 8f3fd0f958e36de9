use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use market::MarketZone;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// "It is time for today's broadcast."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeSignal;

/// Fixed daily fire time: hour and minute in a zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSpec {
    at: NaiveTime,
    zone: MarketZone,
}

impl ScheduleSpec {
    pub fn new(hour: u32, minute: u32, zone: MarketZone) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0)
            .with_context(|| format!("invalid daily time {hour}:{minute}"))?;
        Ok(Self { at, zone })
    }

    pub fn zone(&self) -> MarketZone {
        self.zone
    }

    /// The fire instant on local calendar day `day`.
    fn fire_on(&self, day: NaiveDate) -> DateTime<Utc> {
        self.zone.instant(day.and_time(self.at))
    }

    fn fire_on_day_after(&self, day: NaiveDate) -> DateTime<Utc> {
        match day.succ_opt() {
            Some(next) => self.fire_on(next),
            None => self.fire_on(day) + Duration::hours(24),
        }
    }

    /// First fire instant strictly after `now`.
    ///
    /// Today's hh:mm:00 in the zone, or the next local day's hh:mm:00 when
    /// `now` is already at or past it. With a fixed offset that is exactly
    /// 24 hours later; across an offset change it is 23 or 25.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_day = self.zone.today(now);
        let today = self.fire_on(local_day);

        if now >= today {
            self.fire_on_day_after(local_day)
        } else {
            today
        }
    }
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.at.format("%H:%M"), self.zone)
    }
}

/// Schedule plus the local day it last fired for.
///
/// At most one fire per local day: a wake-up the wall clock observes a little
/// early, or an offset change that pulls today's time back into the future,
/// moves on to the following day.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    spec: ScheduleSpec,
    last_day: Option<NaiveDate>,
}

impl DailySchedule {
    pub fn new(spec: ScheduleSpec) -> Self {
        Self {
            spec,
            last_day: None,
        }
    }

    pub fn next_fire(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let next = self.spec.next_fire_after(now);

        match self.last_day {
            Some(day) if self.spec.zone.today(next) <= day => self.spec.fire_on_day_after(day),
            _ => next,
        }
    }

    pub fn mark_fired(&mut self, at: DateTime<Utc>) {
        self.last_day = Some(self.spec.zone.today(at));
    }
}

/// Emit one [`WakeSignal`] per day at the configured time until cancelled
/// or until the receiving side goes away.
///
/// The wait is recomputed from the current instant on every iteration.
#[instrument(name = "scheduler", skip(wake, cancel), fields(at = %spec))]
pub async fn run(spec: ScheduleSpec, wake: mpsc::Sender<WakeSignal>, cancel: CancellationToken) {
    let mut schedule = DailySchedule::new(spec);

    loop {
        let now = Utc::now();
        let next = schedule.next_fire(now);
        let wait = (next - now).to_std().unwrap_or_default();

        info!(next = %next, wait_secs = wait.as_secs(), "next daily analytics scheduled");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("scheduler cancelled");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        schedule.mark_fired(next);
        info!(due = %next, "daily wake-up");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("scheduler cancelled");
                return;
            }
            sent = wake.send(WakeSignal) => {
                if sent.is_err() {
                    warn!("wake receiver dropped, scheduler stopping");
                    return;
                }
            }
        }
    }
}
