//! Birthday store trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BirthdayRecord, LedgerUpdate, NewBirthday};

/// Persistent birthday storage.
///
/// `update_field` must write only the one ledger key it names, so concurrent
/// writes to other keys of the same record are never clobbered.
/// `update_field` and `delete` return `CakedayError::NotFound` for unknown ids.
#[async_trait]
pub trait BirthdayStore: Send + Sync {
    fn name(&self) -> &str;

    /// All records, with `lastNotified` normalized to the three-key form.
    async fn list(&self) -> Result<Vec<BirthdayRecord>>;

    async fn create(&self, record: NewBirthday) -> Result<String>;

    async fn update_field(&self, update: &LedgerUpdate) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Rewrite legacy `lastNotified` values in place. Returns how many
    /// records changed; a second call returns 0.
    async fn migrate_legacy(&self) -> Result<usize> {
        Ok(0)
    }
}
