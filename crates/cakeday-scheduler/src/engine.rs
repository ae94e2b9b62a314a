//! Cron-driven loop that triggers reminder passes.

use cakeday_core::config::CakedayConfig;
use cakeday_core::error::{CakedayError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cron::CronSchedule;
use crate::dispatch::DispatchCoordinator;

pub struct SchedulerEngine {
    coordinator: Arc<DispatchCoordinator>,
    schedule: CronSchedule,
}

impl SchedulerEngine {
    pub fn new(coordinator: Arc<DispatchCoordinator>, schedule: CronSchedule) -> Self {
        Self { coordinator, schedule }
    }

    /// Build an engine on the configured cadence (every minute in test mode).
    ///
    /// Rejects an expression that parses but has no future trigger, such
    /// as `0 0 30 2 *`.
    pub fn from_config(coordinator: Arc<DispatchCoordinator>, config: &CakedayConfig) -> Result<Self> {
        let schedule = CronSchedule::parse(config.effective_schedule())?;
        let engine = Self::new(coordinator, schedule);
        engine.next_fire(engine.coordinator.clock().now())?;
        Ok(engine)
    }

    pub fn schedule(&self) -> &CronSchedule {
        &self.schedule
    }

    pub fn coordinator(&self) -> &Arc<DispatchCoordinator> {
        &self.coordinator
    }

    /// Next trigger strictly after `now`.
    pub fn next_fire(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.schedule
            .next_after(now, self.coordinator.timezone())
            .ok_or_else(|| {
                CakedayError::InvalidSchedule(format!("'{}' never fires", self.schedule))
            })
    }

    /// Fire passes until `shutdown` flips to true or its sender drops.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(
            "⏰ Scheduler started: '{}' ({})",
            self.schedule,
            self.coordinator.timezone()
        );
        let mut last_fire: Option<DateTime<Utc>> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = self.coordinator.clock().now();
            let from = last_fire.map_or(now, |last| last.max(now));
            let next = match self.next_fire(from) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("❌ Scheduler halted: {e}");
                    return Err(e);
                }
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!("Next reminder pass at {next} (in {}s)", wait.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            last_fire = Some(next);
            match self.coordinator.try_run(self.coordinator.clock().now()).await {
                Ok(report) => tracing::debug!(
                    sent = report.sent,
                    errors = report.errors,
                    "Scheduled pass finished"
                ),
                Err(CakedayError::PassInProgress) => {
                    tracing::warn!("⏭️ Previous pass still running, skipping this tick");
                }
                Err(e) => tracing::error!("❌ Scheduled pass failed: {e}"),
            }
        }

        tracing::info!("🛑 Scheduler stopped");
        Ok(())
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
