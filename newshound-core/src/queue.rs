use crate::error::StoreError;
use crate::store::{QueueClient, ReceivedRecord};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;

/// Durable single-file queue backing the seen-set.
///
/// Records come out oldest first. Receiving does not hide a record: it stays
/// receivable under a fresh receipt until it is deleted.
pub struct SqliteQueue {
    conn: Connection,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl SqliteQueue {
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Delete the database file along with any WAL sidecars.
    pub fn remove(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)?;
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            let sidecar = Path::new(&sidecar);
            if sidecar.exists() {
                fs::remove_file(sidecar)?;
            }
        }
        Ok(())
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        let queue = SqliteQueue { conn };
        queue.init_schema()?;
        Ok(queue)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let queue = SqliteQueue {
            conn: Connection::open_in_memory()?,
        };
        queue.init_schema()?;
        Ok(queue)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS state_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                body TEXT NOT NULL,
                enqueued_at INTEGER NOT NULL,
                receipt TEXT UNIQUE,       -- handle of the latest receive
                receive_count INTEGER NOT NULL DEFAULT 0,
                last_received_at INTEGER
            );
            ",
        )?;
        Ok(())
    }

    /// Number of records waiting in the queue.
    pub fn pending(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM state_records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

impl QueueClient for SqliteQueue {
    fn peek(&self) -> Result<Option<String>, StoreError> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM state_records ORDER BY id LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn receive_one(&self) -> Result<Option<ReceivedRecord>, StoreError> {
        let oldest: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, body FROM state_records ORDER BY id LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((id, body)) = oldest else {
            return Ok(None);
        };

        let receipt = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "UPDATE state_records
             SET receipt = ?1, receive_count = receive_count + 1, last_received_at = ?2
             WHERE id = ?3",
            params![&receipt, current_timestamp(), id],
        )?;

        Ok(Some(ReceivedRecord { receipt, body }))
    }

    fn delete_received(&self, receipt: &str) -> Result<(), StoreError> {
        let deleted = self.conn.execute(
            "DELETE FROM state_records WHERE receipt = ?1",
            params![receipt],
        )?;
        if deleted == 0 {
            return Err(StoreError::UnknownReceipt(receipt.to_string()));
        }
        Ok(())
    }

    fn send_one(&self, body: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO state_records (body, enqueued_at) VALUES (?1, ?2)",
            params![body, current_timestamp()],
        )?;
        Ok(())
    }
}
