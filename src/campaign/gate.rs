//! Daily start gate
//!
//! The campaign starts each daily job at a fixed local hour. `WaitGate` computes the
//! delay to the next start of that hour and sleeps once, re-reading the clock on
//! wake-up instead of polling at a fixed interval.

use crate::{Result, SweepError};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::sync::Arc;
use std::time::Duration;

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock in local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fires when a calendar day's job may start
#[async_trait]
pub trait DailyTrigger: Send + Sync {
    async fn wait_for(&self, day: NaiveDate) -> Result<()>;
}

/// Trigger that never waits (dry runs, tests, `--no-wait`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateTrigger;

#[async_trait]
impl DailyTrigger for ImmediateTrigger {
    async fn wait_for(&self, _day: NaiveDate) -> Result<()> {
        Ok(())
    }
}

/// Blocks until the local clock reaches a given hour of day
#[derive(Clone)]
pub struct WaitGate {
    hour: u32,
    recheck_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for WaitGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitGate")
            .field("hour", &self.hour)
            .field("recheck_interval", &self.recheck_interval)
            .finish()
    }
}

impl WaitGate {
    /// Creates a gate for `hour` (0-23)
    ///
    /// `recheck_interval_minutes` (1-60) is how long to sleep before re-reading the
    /// clock when a computed wake-up did not land in the target hour.
    pub fn new(hour: u32, recheck_interval_minutes: u32) -> Result<Self> {
        Self::with_clock(hour, recheck_interval_minutes, Arc::new(SystemClock))
    }

    pub fn with_clock(
        hour: u32,
        recheck_interval_minutes: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if hour > 23 {
            return Err(SweepError::Validation(format!(
                "hour must be between 0 and 23, got {}",
                hour
            )));
        }

        if !(1..=60).contains(&recheck_interval_minutes) {
            return Err(SweepError::Validation(format!(
                "recheck interval must be between 1 and 60 minutes, got {}",
                recheck_interval_minutes
            )));
        }

        Ok(Self {
            hour,
            recheck_interval: Duration::from_secs(u64::from(recheck_interval_minutes) * 60),
            clock,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn recheck_interval(&self) -> Duration {
        self.recheck_interval
    }

    /// Returns once the local hour equals the target hour
    ///
    /// Returns immediately if the target hour is already under way, so the actual
    /// start may land anywhere inside that hour.
    pub async fn wait_until(&self) {
        loop {
            let now = self.clock.now();
            if now.hour() == self.hour {
                return;
            }

            let delay = time_until_hour(now, self.hour);
            let sleep_for = if delay.is_zero() {
                self.recheck_interval
            } else {
                delay
            };

            tracing::debug!(
                "Start hour {:02}:00 not reached, sleeping {:?}",
                self.hour,
                sleep_for
            );
            tokio::time::sleep(sleep_for).await;
        }
    }
}

#[async_trait]
impl DailyTrigger for WaitGate {
    async fn wait_for(&self, day: NaiveDate) -> Result<()> {
        tracing::info!(
            "Waiting for {:02}:00 to start job scheduled on {}",
            self.hour,
            day.format("%d %b %Y")
        );
        self.wait_until().await;
        Ok(())
    }
}

/// Time from `now` until the next start of `hour`
///
/// Returns zero when `now` already lies inside `hour`.
pub fn time_until_hour(now: NaiveDateTime, hour: u32) -> Duration {
    if now.hour() == hour {
        return Duration::ZERO;
    }

    let Some(start_of_hour) = NaiveTime::from_hms_opt(hour, 0, 0) else {
        return Duration::ZERO;
    };

    let mut target = now.date().and_time(start_of_hour);
    if target <= now {
        target += ChronoDuration::days(1);
    }

    (target - now).to_std().unwrap_or(Duration::ZERO)
}
