use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::error::{PersistenceError, PersistenceResult};
use super::HashCache;
use crate::processing::{HashMethod, HashValue};
use crate::types::Identity;

/// SQLite-backed hash cache
pub struct SqliteHashCache {
    conn: Connection,
}

impl SqliteHashCache {
    /// Open (or create) the cache database at `path`
    pub fn open(path: &Path) -> PersistenceResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PersistenceError::Path(parent.to_path_buf(), e.to_string())
                })?;
            }
        }

        let conn = Connection::open(path)?;
        let cache = Self::with_connection(conn)?;
        info!("Hash cache opened at {}", path.display());
        Ok(cache)
    }

    /// Cache living only as long as the process
    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> PersistenceResult<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 10000;",
        )
        .map_err(|e| PersistenceError::Initialization(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS hash_values (
                file_hash TEXT NOT NULL,
                hash_method TEXT NOT NULL,
                hash_value TEXT NOT NULL,
                PRIMARY KEY (file_hash, hash_method)
            );",
        )
        .map_err(|e| PersistenceError::Initialization(format!("Failed to create schema: {}", e)))?;

        Ok(Self { conn })
    }

    /// Remove every stored value, returning how many were dropped
    pub fn clear(&mut self) -> PersistenceResult<usize> {
        let removed = self.conn.execute("DELETE FROM hash_values", [])?;
        info!("Cleared {} cached hash values", removed);
        Ok(removed)
    }

    /// Number of stored values
    pub fn len(&self) -> PersistenceResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM hash_values", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> PersistenceResult<bool> {
        Ok(self.len()? == 0)
    }

    fn lookup(&self, identity: &Identity, method: HashMethod) -> PersistenceResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT hash_value FROM hash_values WHERE file_hash = ?1 AND hash_method = ?2",
                params![identity.to_hex(), method.name()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl HashCache for SqliteHashCache {
    fn get(&self, identity: &Identity, method: HashMethod) -> Option<HashValue> {
        match self.lookup(identity, method) {
            Ok(Some(hex)) => {
                let value = HashValue::from_hex(&hex, method.shape());
                if value.is_none() {
                    warn!(
                        "Ignoring malformed cached {} hash for {}",
                        method,
                        identity
                    );
                }
                value
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Hash cache lookup failed for {}: {}", identity, e);
                None
            }
        }
    }

    fn set_many(
        &mut self,
        entries: &[(Identity, HashValue)],
        method: HashMethod,
    ) -> PersistenceResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO hash_values (file_hash, hash_method, hash_value)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (identity, value) in entries {
                stmt.execute(params![identity.to_hex(), method.name(), value.to_hex()])?;
            }
        }
        tx.commit()?;

        debug!("Stored {} {} hashes", entries.len(), method);
        Ok(())
    }
}
