//! SQLite birthday store.
//!
//! `last_notified` is a JSON object column. Ledger writes go through
//! `json_set` on a single key, so one statement touches exactly one
//! category and leaves the other two alone. A row still holding a legacy
//! value is normalized in the same statement.

use async_trait::async_trait;
use cakeday_core::error::{CakedayError, Result};
use cakeday_core::traits::BirthdayStore;
use cakeday_core::types::{BirthdayRecord, LastNotified, LedgerUpdate, NewBirthday};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

fn db_err(e: rusqlite::Error) -> CakedayError {
    CakedayError::store(e.to_string())
}

pub struct SqliteBirthdayStore {
    conn: Mutex<Connection>,
}

impl SqliteBirthdayStore {
    /// Open or create the database at `path` and migrate legacy rows.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        let store = Self::init(conn)?;
        tracing::debug!("🗄️ Birthday store opened: {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS birthdays (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                month INTEGER NOT NULL,
                day INTEGER NOT NULL,
                recipient_token TEXT NOT NULL,
                last_notified TEXT,
                created_at TEXT NOT NULL
            );",
        )
        .map_err(db_err)?;

        let store = Self { conn: Mutex::new(conn) };
        let migrated = store.migrate_rows()?;
        if migrated > 0 {
            tracing::info!("📦 Normalized lastNotified on {migrated} legacy record(s)");
        }
        Ok(store)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| CakedayError::store(e.to_string()))
    }

    /// Insert a row with a raw `last_notified` column value, as older
    /// deployments wrote it.
    pub fn insert_raw(&self, record: &NewBirthday, last_notified: Option<&str>) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.lock()?
            .execute(
                "INSERT INTO birthdays (id, name, month, day, recipient_token, last_notified, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    record.name,
                    record.month,
                    record.day,
                    record.recipient_token,
                    last_notified,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        Ok(id)
    }

    /// Raw `last_notified` column for one record.
    pub fn raw_last_notified(&self, id: &str) -> Result<Option<String>> {
        self.lock()?
            .query_row(
                "SELECT last_notified FROM birthdays WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    fn migrate_rows(&self) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        let pending: Vec<(String, serde_json::Value)> = {
            let mut stmt = tx
                .prepare("SELECT id, last_notified FROM birthdays")
                .map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
                })
                .map_err(db_err)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?
                .into_iter()
                .map(|(id, raw)| (id, parse_column(raw.as_deref())))
                .filter(|(_, value)| !LastNotified::is_normalized(value))
                .collect()
        };

        for (id, value) in &pending {
            let normalized = serde_json::to_string(&LastNotified::normalize(value))?;
            tx.execute(
                "UPDATE birthdays SET last_notified = ?1 WHERE id = ?2",
                params![normalized, id],
            )
            .map_err(db_err)?;
            tracing::info!("Updated {id}");
        }

        tx.commit().map_err(db_err)?;
        Ok(pending.len())
    }
}

/// Interpret a `last_notified` column. Pre-JSON rows held a bare date.
fn parse_column(raw: Option<&str>) -> serde_json::Value {
    match raw {
        None => serde_json::Value::Null,
        Some(text) => serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string())),
    }
}

#[async_trait]
impl BirthdayStore for SqliteBirthdayStore {
    fn name(&self) -> &str { "sqlite" }

    async fn list(&self) -> Result<Vec<BirthdayRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, month, day, recipient_token, last_notified, created_at
                 FROM birthdays ORDER BY created_at, id",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let raw: Option<String> = row.get(5)?;
                let created_at: String = row.get(6)?;
                let created_at = match chrono::DateTime::parse_from_rfc3339(&created_at) {
                    Ok(ts) => ts.with_timezone(&chrono::Utc),
                    Err(e) => {
                        tracing::warn!("⚠️ Bad created_at '{created_at}' on {id}: {e}");
                        chrono::DateTime::default()
                    }
                };
                Ok(BirthdayRecord {
                    id,
                    name: row.get(1)?,
                    month: row.get(2)?,
                    day: row.get(3)?,
                    recipient_token: row.get(4)?,
                    last_notified: LastNotified::normalize(&parse_column(raw.as_deref())),
                    created_at,
                })
            })
            .map_err(db_err)?;

        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(db_err)
    }

    async fn create(&self, record: NewBirthday) -> Result<String> {
        record.validate()?;
        let empty = serde_json::to_string(&LastNotified::default())?;
        let id = self.insert_raw(&record, Some(empty.as_str()))?;
        tracing::info!("📅 Birthday for {} saved ({}/{})", record.name, record.day, record.month);
        Ok(id)
    }

    async fn update_field(&self, update: &LedgerUpdate) -> Result<()> {
        let path = format!("$.\"{}\"", update.category.key());
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        let raw: Option<Option<String>> = tx
            .query_row(
                "SELECT last_notified FROM birthdays WHERE id = ?1",
                params![update.record_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        let Some(raw) = raw else {
            return Err(CakedayError::not_found(&update.record_id));
        };
        let current = parse_column(raw.as_deref());
        let replacement = if current.is_object() {
            None
        } else {
            Some(serde_json::to_string(&LastNotified::normalize(&current))?)
        };

        tx.execute(
            "UPDATE birthdays SET last_notified = json_set(COALESCE(?4, last_notified), ?1, ?2)
             WHERE id = ?3",
            params![path, update.value, update.record_id, replacement],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let changed = self
            .lock()?
            .execute("DELETE FROM birthdays WHERE id = ?1", params![id])
            .map_err(db_err)?;
        if changed == 0 {
            return Err(CakedayError::not_found(id));
        }
        Ok(())
    }

    async fn migrate_legacy(&self) -> Result<usize> {
        self.migrate_rows()
    }
}
