//! In-memory birthday store.

use async_trait::async_trait;
use cakeday_core::error::{CakedayError, Result};
use cakeday_core::traits::BirthdayStore;
use cakeday_core::types::{BirthdayRecord, LastNotified, LedgerUpdate, NewBirthday};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredBirthday {
    id: String,
    name: String,
    month: u32,
    day: u32,
    recipient_token: String,
    /// Raw persisted form, so legacy shapes can be represented.
    last_notified: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl StoredBirthday {
    fn to_record(&self) -> BirthdayRecord {
        BirthdayRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            month: self.month,
            day: self.day,
            recipient_token: self.recipient_token.clone(),
            last_notified: LastNotified::normalize(&self.last_notified),
            created_at: self.created_at,
        }
    }
}

/// Store kept entirely in process memory. Insertion order is preserved.
#[derive(Debug, Default)]
pub struct InMemoryBirthdayStore {
    records: Mutex<Vec<StoredBirthday>>,
}

impl InMemoryBirthdayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record with an arbitrary persisted `lastNotified` value.
    pub fn insert_raw(&self, record: NewBirthday, last_notified: serde_json::Value) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.lock()?.push(StoredBirthday {
            id: id.clone(),
            name: record.name,
            month: record.month,
            day: record.day,
            recipient_token: record.recipient_token,
            last_notified,
            created_at: chrono::Utc::now(),
        });
        Ok(id)
    }

    /// Raw persisted `lastNotified` for one record.
    pub fn raw_last_notified(&self, id: &str) -> Option<serde_json::Value> {
        self.lock()
            .ok()?
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.last_notified.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredBirthday>>> {
        self.records
            .lock()
            .map_err(|e| CakedayError::store(e.to_string()))
    }
}

#[async_trait]
impl BirthdayStore for InMemoryBirthdayStore {
    fn name(&self) -> &str { "memory" }

    async fn list(&self) -> Result<Vec<BirthdayRecord>> {
        Ok(self.lock()?.iter().map(StoredBirthday::to_record).collect())
    }

    async fn create(&self, record: NewBirthday) -> Result<String> {
        record.validate()?;
        let empty = serde_json::to_value(LastNotified::default())?;
        self.insert_raw(record, empty)
    }

    async fn update_field(&self, update: &LedgerUpdate) -> Result<()> {
        let mut records = self.lock()?;
        let stored = records
            .iter_mut()
            .find(|r| r.id == update.record_id)
            .ok_or_else(|| CakedayError::not_found(&update.record_id))?;

        if !stored.last_notified.is_object() {
            stored.last_notified =
                serde_json::to_value(LastNotified::normalize(&stored.last_notified))?;
        }
        let value = match &update.value {
            Some(date) => serde_json::Value::String(date.clone()),
            None => serde_json::Value::Null,
        };
        if let Some(obj) = stored.last_notified.as_object_mut() {
            obj.insert(update.category.key().to_string(), value);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(CakedayError::not_found(id));
        }
        Ok(())
    }

    async fn migrate_legacy(&self) -> Result<usize> {
        let mut records = self.lock()?;
        let mut migrated = 0;
        for stored in records.iter_mut() {
            if LastNotified::is_normalized(&stored.last_notified) {
                continue;
            }
            stored.last_notified =
                serde_json::to_value(LastNotified::normalize(&stored.last_notified))?;
            tracing::info!("Migrated lastNotified for {}", stored.id);
            migrated += 1;
        }
        Ok(migrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cakeday_core::types::NotifyCategory;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_list() {
        let store = InMemoryBirthdayStore::new();
        let id = store.create(NewBirthday::new("Asha", 3, 17, "tok-a")).await.unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].last_notified, LastNotified::default());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid() {
        let store = InMemoryBirthdayStore::new();
        let result = store.create(NewBirthday::new("Asha", 2, 30, "tok")).await;
        assert!(matches!(result, Err(CakedayError::InvalidRecord(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_field_touches_one_key() {
        let store = InMemoryBirthdayStore::new();
        let id = store
            .insert_raw(
                NewBirthday::new("Asha", 3, 17, "tok"),
                json!({"2days": null, "1day": "2024-03-16", "birthday": null}),
            )
            .unwrap();

        store
            .update_field(&LedgerUpdate {
                record_id: id.clone(),
                category: NotifyCategory::TwoDays,
                value: Some("2024-03-15".into()),
            })
            .await
            .unwrap();

        assert_eq!(
            store.raw_last_notified(&id).unwrap(),
            json!({"2days": "2024-03-15", "1day": "2024-03-16", "birthday": null})
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = InMemoryBirthdayStore::new();
        let update = LedgerUpdate {
            record_id: "ghost".into(),
            category: NotifyCategory::Birthday,
            value: Some("2024-01-01".into()),
        };
        assert!(store.update_field(&update).await.unwrap_err().is_not_found());
        assert!(store.delete("ghost").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_deleted_record_stays_gone() {
        let store = InMemoryBirthdayStore::new();
        let id = store.create(NewBirthday::new("Asha", 3, 17, "tok")).await.unwrap();
        store.delete(&id).await.unwrap();
        assert!(store.list().await.unwrap().iter().all(|r| r.id != id));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_migrate_legacy_is_idempotent() {
        let store = InMemoryBirthdayStore::new();
        let legacy = store
            .insert_raw(NewBirthday::new("Old", 1, 1, "t1"), json!("2023-01-01"))
            .unwrap();
        let never = store
            .insert_raw(NewBirthday::new("Never", 2, 2, "t2"), serde_json::Value::Null)
            .unwrap();
        store.create(NewBirthday::new("New", 3, 3, "t3")).await.unwrap();

        assert_eq!(store.migrate_legacy().await.unwrap(), 2);
        assert_eq!(store.migrate_legacy().await.unwrap(), 0);

        assert_eq!(
            store.raw_last_notified(&legacy).unwrap(),
            json!({"2days": null, "1day": null, "birthday": "2023-01-01"})
        );
        assert_eq!(
            store.raw_last_notified(&never).unwrap(),
            json!({"2days": null, "1day": null, "birthday": null})
        );
    }
}
