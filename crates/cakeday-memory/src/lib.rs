//! # Cakeday Memory
//! Birthday store backends: SQLite for real deployments, in-memory for
//! tests and throwaway runs.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryBirthdayStore;
pub use sqlite::SqliteBirthdayStore;

use cakeday_core::config::CakedayConfig;
use cakeday_core::error::{CakedayError, Result};
use cakeday_core::traits::BirthdayStore;
use std::sync::Arc;

/// Create a store backend from configuration.
pub fn create_store(config: &CakedayConfig) -> Result<Arc<dyn BirthdayStore>> {
    match config.store.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteBirthdayStore::open(&config.store_path())?)),
        "memory" => Ok(Arc::new(InMemoryBirthdayStore::new())),
        other => Err(CakedayError::config(format!("Unknown store backend: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_memory_store() {
        let mut config = CakedayConfig::default();
        config.store.backend = "memory".into();
        let store = create_store(&config).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn test_create_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CakedayConfig::default();
        config.store.path = dir.path().join("b.db").to_string_lossy().to_string();
        let store = create_store(&config).unwrap();
        assert_eq!(store.name(), "sqlite");
    }

    #[test]
    fn test_unknown_backend() {
        let mut config = CakedayConfig::default();
        config.store.backend = "firestore".into();
        assert!(matches!(create_store(&config), Err(CakedayError::Config(_))));
    }
}
