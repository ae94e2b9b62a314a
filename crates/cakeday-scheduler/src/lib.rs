//! # Cakeday Scheduler
//!
//! Decides which birthday reminders are due, sends each one at most once
//! per local day, and runs that pass on a cron cadence.
//!
//! ## Architecture
//! ```text
//! SchedulerEngine (cron, local timezone)
//!   └── DispatchCoordinator::try_run(now)      one pass at a time
//!         ├── store.list()
//!         └── per record (bounded fan-out)
//!               ├── eligibility::evaluate       2 / 1 / 0 days out
//!               ├── ledger::is_satisfied        already sent today?
//!               ├── transport.send
//!               └── Delivered → store.update_field(ledger key)
//!                   InvalidToken → store.delete
//!                   Transient → retry next pass
//! ```

pub mod cron;
pub mod datemath;
pub mod dispatch;
pub mod eligibility;
pub mod engine;
pub mod ledger;

pub use cron::CronSchedule;
pub use dispatch::{DispatchCoordinator, RunReport};
pub use engine::SchedulerEngine;
