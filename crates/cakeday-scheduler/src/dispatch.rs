//! One reminder pass over every stored birthday.
//!
//! Delivery is commit-after-success: the ledger key is written only once the
//! transport confirms delivery. If that write fails the next pass on the
//! same day sends again and retries the commit, so a reminder can be
//! delivered twice but the ledger always converges.

use cakeday_core::error::{CakedayError, Result};
use cakeday_core::traits::{BirthdayStore, Clock, PushTransport};
use cakeday_core::types::{BirthdayRecord, PushMessage, SendOutcome};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{datemath, eligibility, ledger};

/// Default cap on concurrent sends within one pass.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Counters for one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Local date the pass evaluated (`YYYY-MM-DD`).
    pub today: String,
    pub records: usize,
    pub sent: usize,
    pub already_sent: usize,
    /// Records dropped because their token is permanently invalid.
    pub removed: usize,
    pub transient_failures: usize,
    /// Delivered, but the ledger write failed; will resend next pass.
    pub commit_failures: usize,
    /// Deleted by someone else while the pass was running.
    pub vanished: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    NotDue,
    AlreadySent,
    Sent,
    Removed,
    Transient,
    CommitFailed,
    Vanished,
    Failed,
}

impl RunReport {
    fn tally(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::NotDue => {}
            RecordOutcome::AlreadySent => self.already_sent += 1,
            RecordOutcome::Sent => self.sent += 1,
            RecordOutcome::Removed => self.removed += 1,
            RecordOutcome::Transient => self.transient_failures += 1,
            RecordOutcome::CommitFailed => self.commit_failures += 1,
            RecordOutcome::Vanished => self.vanished += 1,
            RecordOutcome::Failed => self.errors += 1,
        }
    }
}

/// Runs reminder passes against injected store, transport, and clock.
pub struct DispatchCoordinator {
    store: Arc<dyn BirthdayStore>,
    transport: Arc<dyn PushTransport>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    max_concurrent: usize,
    /// Held for the whole pass so passes never overlap.
    run_guard: Mutex<()>,
}

impl DispatchCoordinator {
    pub fn new(
        store: Arc<dyn BirthdayStore>,
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            timezone,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            run_guard: Mutex::new(()),
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn BirthdayStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Run a pass at the clock's current time, waiting for any running pass.
    pub async fn run_now(&self) -> Result<RunReport> {
        self.run(self.clock.now()).await
    }

    /// Run a pass for `now`, waiting for any running pass to finish first.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let _guard = self.run_guard.lock().await;
        self.run_pass(now).await
    }

    /// Run a pass for `now` unless one is already running.
    pub async fn try_run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            return Err(CakedayError::PassInProgress);
        };
        self.run_pass(now).await
    }

    async fn run_pass(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let today = datemath::local_today(now, self.timezone);
        let today_str = datemath::today_str(today);
        info!("⏳ Checking birthdays for {today_str} ({})", self.timezone);

        let records = self.store.list().await.inspect_err(|e| {
            error!("❌ Could not load birthdays: {e}");
        })?;

        let mut report = RunReport {
            today: today_str.clone(),
            records: records.len(),
            ..RunReport::default()
        };

        let today_ref = today_str.as_str();
        let outcomes: Vec<RecordOutcome> = stream::iter(records)
            .map(move |record| self.process_record(record, today, today_ref))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        for outcome in outcomes {
            report.tally(outcome);
        }

        info!(
            records = report.records,
            sent = report.sent,
            already_sent = report.already_sent,
            removed = report.removed,
            transient = report.transient_failures,
            commit_failures = report.commit_failures,
            errors = report.errors,
            "✅ Birthday pass complete for {today_str}"
        );
        Ok(report)
    }

    async fn process_record(
        &self,
        mut record: BirthdayRecord,
        today: NaiveDate,
        today_str: &str,
    ) -> RecordOutcome {
        let category = match eligibility::evaluate(&record, today) {
            Ok(Some(category)) => category,
            Ok(None) => return RecordOutcome::NotDue,
            Err(e) => {
                warn!(record_id = %record.id, "Skipping unreadable birthday: {e}");
                return RecordOutcome::Failed;
            }
        };

        if ledger::is_satisfied(&record, category, today_str) {
            debug!(record_id = %record.id, %category, "Already notified today");
            return RecordOutcome::AlreadySent;
        }

        let message = PushMessage::reminder(&record.recipient_token, category, &record.name);
        match self.transport.send(&message).await {
            SendOutcome::Delivered => {
                let update = ledger::mark_satisfied(&mut record, category, today_str);
                match self.store.update_field(&update).await {
                    Ok(()) => {
                        info!(record_id = %record.id, %category, "🎉 Notification sent: {}", message.body);
                        RecordOutcome::Sent
                    }
                    Err(e) if e.is_not_found() => {
                        debug!(record_id = %record.id, "Record deleted during pass");
                        RecordOutcome::Vanished
                    }
                    Err(e) => {
                        error!(
                            record_id = %record.id,
                            %category,
                            "Sent but could not record it, will resend next pass: {e}"
                        );
                        RecordOutcome::CommitFailed
                    }
                }
            }
            SendOutcome::PermanentInvalidToken(reason) => {
                warn!(record_id = %record.id, "🗑️ Token rejected permanently ({reason}), removing {}", record.name);
                match self.store.delete(&record.id).await {
                    Ok(()) => RecordOutcome::Removed,
                    Err(e) if e.is_not_found() => RecordOutcome::Vanished,
                    Err(e) => {
                        error!(record_id = %record.id, "Could not remove record: {e}");
                        RecordOutcome::Failed
                    }
                }
            }
            SendOutcome::TransientFailure(reason) => {
                warn!(record_id = %record.id, %category, "❌ Error sending notification: {reason}");
                RecordOutcome::Transient
            }
        }
    }
}
