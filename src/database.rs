//! SQLite database for persistent storage.
//!
//! Holds the key-value table every component persists through and the
//! `config` table of tunable settings. Each key write is its own
//! statement, so a crash loses at most the write in flight.

use crate::error::StoreError;
use crate::store::KeyValueStore;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Default settings seeded into an empty `config` table.
pub const DEFAULT_CONFIG: [(&str, &str, &str); 6] = [
    (
        "chunk_seconds",
        "30",
        "Seconds of tracked time per history record",
    ),
    (
        "reference_minutes_per_day",
        "600",
        "Minutes per day that count as full utilization",
    ),
    (
        "tick_interval_ms",
        "1000",
        "Timer tick interval (milliseconds)",
    ),
    (
        "history_retention",
        "0",
        "Maximum history records to keep (0 = unlimited)",
    ),
    (
        "day_boundary",
        "utc",
        "Calendar used to date records (utc or local)",
    ),
    ("server_port", "13235", "Port for the local HTTP API"),
];

/// A single configuration row.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

/// Database wrapper with thread-safe connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates the database at the default location.
    ///
    /// Creates `<data dir>/essential/essential.db` if it doesn't exist.
    pub fn open() -> Result<Self, StoreError> {
        let db_path = Self::get_db_path();

        if let Some(parent) = db_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(?e, path = ?parent, "Failed to create data directory");
            }
        }

        tracing::info!(path = ?db_path, "Opening database");

        let conn = Connection::open(&db_path)?;

        // Enable WAL mode for crash safety
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::with_connection(conn)
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Returns the default database path.
    fn get_db_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("essential")
            .join("essential.db")
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Flat string store, one row per key
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Configuration settings
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        // Seed missing defaults, leaving existing values alone
        let now = Utc::now().to_rfc3339();
        let mut added = 0;
        for (key, value, description) in DEFAULT_CONFIG {
            added += conn.execute(
                "INSERT OR IGNORE INTO config (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![key, value, description, &now],
            )?;
        }
        if added > 0 {
            tracing::info!("Added {} default config settings", added);
        }

        tracing::debug!("Database schema initialized");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // === Config Methods ===

    /// Gets a configuration value by key.
    pub fn get_config(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Sets a configuration value, inserting the key if it is new.
    pub fn set_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO config (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, &now],
        )?;
        Ok(())
    }

    /// Gets all config settings, sorted by key.
    pub fn get_all_config(&self) -> Result<Vec<ConfigEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key, value, description FROM config ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok(ConfigEntry {
                key: row.get(0)?,
                value: row.get(1)?,
                description: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<SqlResult<Vec<_>>>()?)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_database() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_all_config().unwrap().len(), DEFAULT_CONFIG.len());
    }

    #[test]
    fn test_kv_roundtrip_and_remove() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.get("ess_sw_task").unwrap(), None);
        db.set("ess_sw_task", "Deep Work").unwrap();
        db.set("ess_sw_task", "Reading").unwrap();
        assert_eq!(db.get("ess_sw_task").unwrap().as_deref(), Some("Reading"));

        db.remove("ess_sw_task").unwrap();
        assert_eq!(db.get("ess_sw_task").unwrap(), None);
        // Removing a missing key is fine
        db.remove("ess_sw_task").unwrap();
    }

    #[test]
    fn test_config_defaults_and_update() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_config("chunk_seconds").unwrap().as_deref(), Some("30"));
        assert_eq!(db.get_config("missing").unwrap(), None);

        db.set_config("chunk_seconds", "15").unwrap();
        assert_eq!(db.get_config("chunk_seconds").unwrap().as_deref(), Some("15"));

        db.set_config("custom", "x").unwrap();
        let all = db.get_all_config().unwrap();
        let custom = all.iter().find(|e| e.key == "custom").unwrap();
        assert_eq!(custom.value, "x");
        assert_eq!(custom.description, None);
    }

    #[test]
    fn test_reseed_keeps_existing_values() {
        let db = Database::open_in_memory().unwrap();
        db.set_config("server_port", "9000").unwrap();
        db.init_schema().unwrap();
        assert_eq!(db.get_config("server_port").unwrap().as_deref(), Some("9000"));
    }

    #[test]
    fn test_ledger_over_database() {
        use crate::store::{HistoryLedger, HistoryRecord};
        use chrono::NaiveDate;

        let db = Arc::new(Database::open_in_memory().unwrap());
        let ledger = HistoryLedger::new(db.clone());
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        ledger
            .append(HistoryRecord::new(date, "learning_ds", 30))
            .unwrap();

        assert_eq!(HistoryLedger::new(db).total_for(date), 30);
    }
}
