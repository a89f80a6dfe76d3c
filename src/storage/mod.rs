pub mod contract_db;
pub mod keys;
pub mod memory;

pub use contract_db::ContractDatabase;
pub use memory::MemoryStore;

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a contract store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Contract not reachable or not deployed
    #[error("contract store unavailable")]
    Unavailable,

    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Receipt for an accepted `set_data` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub from: String,
    pub key: String,
}

impl TxReceipt {
    pub fn new(from: &str, key: &str) -> Self {
        Self {
            tx_hash: format!("0x{}", uuid::Uuid::new_v4().simple()),
            from: from.to_string(),
            key: key.to_string(),
        }
    }
}

/// The contract's generic string/bytes storage API.
///
/// `get_data` returns an empty vector for keys that were never written, the
/// same way the deployed contract does. There is no compare-and-set: callers
/// that read a blob, modify it and write it back can lose concurrent writes.
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn is_available(&self) -> Result<bool, StoreError>;

    async fn get_data(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Write `value` under `key`. `from` is the signing address.
    async fn set_data(&self, key: &str, value: &[u8], from: &str) -> Result<TxReceipt, StoreError>;

    /// Address of the contract itself.
    fn address(&self) -> String;
}

/// Ensure the parent directory of a store file exists
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
