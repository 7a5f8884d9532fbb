//! Overlay slot storage trait and SQLite implementation.

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;
use url::Url;

use crate::error::StoreError;

/// String-keyed storage of serialized overlays, one slot per collection.
pub trait OverlayStore: Send + Sync {
  /// Raw contents of a slot, `None` if it was never written.
  fn read_slot(&self, slot: &str) -> Result<Option<String>, StoreError>;

  /// Replace the contents of a slot (last writer wins).
  fn write_slot(&self, slot: &str, data: &str) -> Result<(), StoreError>;
}

/// SQLite-backed slot storage.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at `path`, creating parent directories.
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    Self::with_connection(Connection::open(path)?)
  }

  /// A store that lives only as long as the process.
  pub fn in_memory() -> Result<Self, StoreError> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch(SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS overlay_slots (
    slot TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    saved_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl OverlayStore for SqliteStore {
  fn read_slot(&self, slot: &str) -> Result<Option<String>, StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
    let data = conn
      .query_row(
        "SELECT data FROM overlay_slots WHERE slot = ?",
        params![slot],
        |row| row.get(0),
      )
      .optional()?;
    Ok(data)
  }

  fn write_slot(&self, slot: &str, data: &str) -> Result<(), StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
    conn.execute(
      "INSERT INTO overlay_slots (slot, data, saved_at) VALUES (?, ?, datetime('now'))
       ON CONFLICT(slot) DO UPDATE SET data = excluded.data, saved_at = excluded.saved_at",
      params![slot, data],
    )?;
    Ok(())
  }
}

/// Slot key for a collection URL: `overlay:<sha256 of the normalized url>`.
///
/// Scheme and host case are normalized by the URL parser; a trailing slash
/// does not change the key.
pub fn default_slot(url: &Url) -> String {
  let normalized = url.as_str().trim_end_matches('/');

  let mut hasher = Sha256::new();
  hasher.update(normalized.as_bytes());
  format!("overlay:{}", hex::encode(hasher.finalize()))
}
