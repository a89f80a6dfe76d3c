//! Signing identity used for store writes and the reveal challenge.
//!
//! Signatures are requested but never verified anywhere; a successful
//! round-trip is what unlocks a write or a message reveal.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// User declined the signing prompt
    #[error("user rejected the signature request")]
    Rejected,

    #[error("wallet not connected")]
    NotConnected,
}

#[async_trait]
pub trait Wallet: Send + Sync {
    /// Connected account address, if any.
    fn address(&self) -> Option<String>;

    async fn sign_message(&self, message: &str) -> Result<String, WalletError>;
}

/// Wallet that signs locally with random bytes, with a switch to simulate
/// the user declining prompts.
pub struct LocalWallet {
    address: Option<String>,
    approve: AtomicBool,
}

impl LocalWallet {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            approve: AtomicBool::new(true),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            address: None,
            approve: AtomicBool::new(false),
        }
    }

    /// Fresh random `0x` address.
    pub fn random() -> Self {
        let bytes: [u8; 20] = rand::random();
        Self::new(format!("0x{}", hex::encode(bytes)))
    }

    pub fn set_approve(&self, approve: bool) {
        self.approve.store(approve, Ordering::SeqCst);
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> Option<String> {
        self.address.clone()
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        if self.address.is_none() {
            return Err(WalletError::NotConnected);
        }
        if !self.approve.load(Ordering::SeqCst) {
            log::debug!("Signature request declined ({} bytes)", message.len());
            return Err(WalletError::Rejected);
        }
        let r: [u8; 32] = rand::random();
        let s: [u8; 32] = rand::random();
        Ok(format!("0x{}{}1b", hex::encode(r), hex::encode(s)))
    }
}

/// Message signed before an opaque chat message is revealed.
#[derive(Debug, Clone)]
pub struct DecryptChallenge {
    pub public_key: String,
    pub contract_address: String,
    pub chain_id: u64,
}

impl DecryptChallenge {
    pub const PUBLIC_KEY_DIGITS: usize = 2000;

    pub fn new(contract_address: impl Into<String>, chain_id: u64) -> Self {
        Self {
            public_key: generate_public_key(),
            contract_address: contract_address.into(),
            chain_id,
        }
    }

    pub fn message(&self) -> String {
        format!(
            "publickey:{}\ncontractAddresses:{}\ncontractsChainId:{}",
            self.public_key, self.contract_address, self.chain_id
        )
    }
}

/// Session public key: `0x` followed by random hex digits.
fn generate_public_key() -> String {
    let bytes: Vec<u8> = (0..DecryptChallenge::PUBLIC_KEY_DIGITS / 2)
        .map(|_| rand::random::<u8>())
        .collect();
    format!("0x{}", hex::encode(bytes))
}

/// Payload signed before each store write.
pub fn transaction_message(key: &str, value: &[u8]) -> String {
    format!("setData:{key}:{}", value.len())
}
