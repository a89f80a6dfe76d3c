use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{ContractStore, StoreError, TxReceipt, ensure_parent_dir};

/// SQLite-backed stand-in for the deployed key/value contract.
pub struct ContractDatabase {
    conn: Mutex<Connection>,
    address: String,
}

impl ContractDatabase {
    /// Open (or create) the contract database at `path`
    pub fn open<P: AsRef<Path>>(path: P, address: &str) -> Result<Self, StoreError> {
        ensure_parent_dir(path.as_ref()).map_err(|err| StoreError::Database(err.to_string()))?;
        let conn = Connection::open(path)?;
        Self::with_connection(conn, address)
    }

    /// In-memory database, mostly for tests
    pub fn in_memory(address: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, address)
    }

    fn with_connection(conn: Connection, address: &str) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            address: address.to_string(),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    /// Get the number of accepted transactions
    pub fn transaction_count(&self) -> Result<usize, StoreError> {
        let conn = self.connection()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get all transactions sent from an address, oldest first
    pub fn transactions_from(&self, from: &str) -> Result<Vec<TxReceipt>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT tx_hash, sender, key
             FROM transactions
             WHERE sender = ?1
             ORDER BY seq ASC",
        )?;

        let receipts = stmt
            .query_map(params![from], |row| {
                Ok(TxReceipt {
                    tx_hash: row.get(0)?,
                    from: row.get(1)?,
                    key: row.get(2)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(receipts)
    }
}

fn init_schema(conn: &Connection) -> SqlResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS contract_data (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_hash TEXT NOT NULL UNIQUE,
            sender TEXT NOT NULL,
            key TEXT NOT NULL,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_sender ON transactions(sender)",
        [],
    )?;

    Ok(())
}

#[async_trait]
impl ContractStore for ContractDatabase {
    async fn is_available(&self) -> Result<bool, StoreError> {
        Ok(self.connection().is_ok())
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let conn = self.connection()?;
        let value: Option<Vec<u8>> = conn
            .query_row(
                "SELECT value FROM contract_data WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or_default())
    }

    async fn set_data(&self, key: &str, value: &[u8], from: &str) -> Result<TxReceipt, StoreError> {
        let receipt = TxReceipt::new(from, key);
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO contract_data (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now'))",
            params![key, value],
        )?;
        tx.execute(
            "INSERT INTO transactions (tx_hash, sender, key) VALUES (?1, ?2, ?3)",
            params![receipt.tx_hash, from, key],
        )?;
        tx.commit()?;
        Ok(receipt)
    }

    fn address(&self) -> String {
        self.address.clone()
    }
}
