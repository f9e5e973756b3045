//! Whole-session persistence: both surface snapshots plus the extracted
//! texts, saved as a single JSON record in SQLite.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::history::Snapshot;

const CURRENT_SLOT: &str = "current";

/// Everything the save/load feature persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedWork {
    pub surface_a: Snapshot,
    pub surface_b: Snapshot,
    pub text_a: String,
    pub text_b: String,
}

/// SQLite-backed store holding one saved-work record.
pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Open (or create) the store at the given path.
    pub fn open(db_path: &Path) -> Result<Self, String> {
        let conn = Connection::open(db_path)
            .map_err(|e| format!("failed to open session store: {e}"))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| format!("PRAGMA failed: {e}"))?;
        info!(path = %db_path.display(), "session store opened");
        Self::with_connection(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("failed to open in-memory store: {e}"))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, String> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS saved_work (
                slot TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                saved_at INTEGER NOT NULL
            );",
        )
        .map_err(|e| format!("create saved_work table failed: {e}"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Persist the record, replacing any previous save.
    pub fn save(&self, work: &SavedWork) -> Result<(), String> {
        let payload =
            serde_json::to_string(work).map_err(|e| format!("serialize saved work: {e}"))?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO saved_work (slot, payload, saved_at)
             VALUES (?1, ?2, ?3)",
            params![CURRENT_SLOT, payload, now_unix()],
        )
        .map_err(|e| format!("save failed: {e}"))?;
        Ok(())
    }

    /// Load the record. `Ok(None)` means no saved work exists, which is not
    /// an error.
    pub fn load(&self) -> Result<Option<SavedWork>, String> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM saved_work WHERE slot = ?1",
                params![CURRENT_SLOT],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("load query failed: {e}"))?;

        match payload {
            Some(json) => match serde_json::from_str(&json) {
                Ok(work) => Ok(Some(work)),
                Err(e) => {
                    warn!(error = %e, "saved work payload corrupt");
                    Err(format!("saved work payload corrupt: {e}"))
                }
            },
            None => Ok(None),
        }
    }

    /// Drop the saved record, if any.
    pub fn clear(&self) -> Result<(), String> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM saved_work WHERE slot = ?1",
            params![CURRENT_SLOT],
        )
        .map_err(|e| format!("clear failed: {e}"))?;
        Ok(())
    }
}

/// Current time as Unix timestamp (seconds).
fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
