//! Database persistence layer for CopperChain
//!
//! One table maps block hash to serialized block; a reserved metadata key
//! holds the current tail hash. The store is treated as an opaque byte map:
//! all interpretation of the values happens in the chain layer.

use crate::error::ChainError;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

/// Reserved metadata key holding the hash of the most recent block.
const TAIL_KEY: &str = "tail";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                hash BLOB PRIMARY KEY,
                data BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            ChainError::DatabaseError(format!("Failed to create metadata table: {}", e))
        })?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ChainError> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }

    /// Stores a block and moves the tail pointer to it in one transaction,
    /// so a reader can never observe the block without the tail or vice versa.
    pub fn put_block(&self, hash: &[u8], data: &[u8]) -> Result<(), ChainError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        tx.execute(
            "INSERT OR REPLACE INTO blocks (hash, data) VALUES (?1, ?2)",
            params![hash, data],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to save block: {}", e)))?;

        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![TAIL_KEY, hash],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to update tail: {}", e)))?;

        tx.commit()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to commit block: {}", e)))?;
        Ok(())
    }

    /// Fetches the serialized block stored under `hash`, if any.
    pub fn get_block(&self, hash: &[u8]) -> Result<Option<Vec<u8>>, ChainError> {
        let conn = self.lock()?;
        let data = conn
            .query_row(
                "SELECT data FROM blocks WHERE hash = ?1",
                params![hash],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to read block: {}", e)))?;
        Ok(data)
    }

    /// Hash of the most recently appended block, or None on a fresh store.
    pub fn tail(&self) -> Result<Option<Vec<u8>>, ChainError> {
        let conn = self.lock()?;
        let tail = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![TAIL_KEY],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to read tail: {}", e)))?;
        Ok(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_store_is_empty() {
        let db = Database::open(":memory:").unwrap();
        assert!(db.tail().unwrap().is_none());
        assert!(db.get_block(b"nope").unwrap().is_none());
    }

    #[test]
    fn test_put_and_get_block() {
        let db = Database::open(":memory:").unwrap();
        db.put_block(b"hash-1", b"block-1").unwrap();

        assert_eq!(db.get_block(b"hash-1").unwrap().unwrap(), b"block-1");
        assert_eq!(db.tail().unwrap().unwrap(), b"hash-1");
    }

    #[test]
    fn test_tail_follows_latest_block() {
        let db = Database::open(":memory:").unwrap();
        db.put_block(b"hash-1", b"block-1").unwrap();
        db.put_block(b"hash-2", b"block-2").unwrap();

        assert_eq!(db.tail().unwrap().unwrap(), b"hash-2");
        // Earlier blocks stay reachable by hash.
        assert_eq!(db.get_block(b"hash-1").unwrap().unwrap(), b"block-1");
    }
}
