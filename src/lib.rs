//! Temporary social spaces on top of a contract key/value store.
//!
//! Events and their chat messages are kept as JSON blobs in the store and
//! indexed through id list blobs ([`directory`]). A [`session`] tracks the
//! event a user has open, its feed and a handful of timers.

pub mod codec;
pub mod common;
pub mod config;
pub mod directory;
pub mod error;
pub mod session;
pub mod storage;
pub mod wallet;

pub use directory::DirectoryIndex;
pub use error::AppError;
pub use session::{SessionManager, SessionService, SessionSettings};
pub use storage::{ContractDatabase, ContractStore, MemoryStore};
pub use wallet::{LocalWallet, Wallet};
