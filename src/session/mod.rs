pub mod manager;
pub mod refresher;
pub mod service;
pub mod state;

pub use manager::{SessionManager, SessionSettings};
pub use service::SessionService;
pub use state::{AppState, FeedMessage, SessionMode, StatusKind, TransactionStatus};
