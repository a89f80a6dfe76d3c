//! In-memory contract store, used by tests and local demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ContractStore, StoreError, TxReceipt};

pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
    available: AtomicBool,
    writes: AtomicUsize,
    address: String,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("0x0000000000000000000000000000000000005ace")
    }
}

impl MemoryStore {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
            address: address.into(),
        }
    }

    /// Simulate the contract going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of accepted `set_data` transactions.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Write a blob directly, without a transaction.
    pub async fn put_raw(&self, key: &str, value: &[u8]) {
        self.data.write().await.insert(key.to_string(), value.to_vec());
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn is_available(&self) -> Result<bool, StoreError> {
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.ensure_available()?;
        Ok(self.data.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn set_data(&self, key: &str, value: &[u8], from: &str) -> Result<TxReceipt, StoreError> {
        self.ensure_available()?;
        self.data.write().await.insert(key.to_string(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(TxReceipt::new(from, key))
    }

    fn address(&self) -> String {
        self.address.clone()
    }
}
