//! Daily reminder pass over enrollments that are about to close.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, NaiveTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::domain::error::DomainError;
use crate::domain::service::Service;

/// Fires once a day at a fixed UTC wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn at(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Parse "HH:MM" or "HH:MM:SS".
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        let at = NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .with_context(|| format!("invalid time of day '{raw}', expected HH:MM"))?;
        Ok(Self { at })
    }

    /// First scheduled instant strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today > now {
            today
        } else {
            today + chrono::Duration::days(1)
        }
    }
}

pub struct ExpiryJob {
    service: Arc<Service>,
    schedule: DailySchedule,
    window_days: i64,
}

impl ExpiryJob {
    pub fn new(service: Arc<Service>, schedule: DailySchedule, window_days: i64) -> Self {
        Self {
            service,
            schedule,
            window_days,
        }
    }

    /// One notification pass. Returns the number of reminders delivered.
    pub async fn run_once(&self) -> Result<usize, DomainError> {
        self.service.notify_expiring(self.window_days).await
    }

    /// Sleep until each scheduled instant and run a pass, until cancelled.
    /// A failed pass is logged; the next day's pass still runs.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        info!(
            window_days = self.window_days,
            "Expiry notification job started"
        );
        loop {
            let now = Utc::now();
            let next = self.schedule.next_after(now);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(next_run = %next, "Waiting for next expiry notification pass");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            match self.run_once().await {
                Ok(n) => info!(delivered = n, "Expiry notification pass finished"),
                Err(e) => error!("Expiry notification pass failed: {e}"),
            }
        }
        info!("Expiry notification job stopped");
        Ok(())
    }
}
