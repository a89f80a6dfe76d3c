//! Error types shared across the crate.

use thiserror::Error;

use crate::codec::DecodeError;
use crate::storage::StoreError;
use crate::wallet::WalletError;

/// Errors surfaced to whoever initiated a directory or session operation.
#[derive(Debug, Error)]
pub enum AppError {
    /// Contract is not reachable or not deployed
    #[error("contract store is unavailable")]
    StoreUnavailable,

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Join attempted while the counter is at capacity
    #[error("event {event_id} is full ({max} participants)")]
    EventFull { event_id: String, max: u32 },

    #[error("event not found: {0}")]
    EventNotFound(String),

    /// User declined a signing prompt
    #[error("transaction rejected by user")]
    WalletRejected,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unknown(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => AppError::StoreUnavailable,
            other => AppError::Unknown(other.to_string()),
        }
    }
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected => AppError::WalletRejected,
            WalletError::NotConnected => {
                AppError::Unknown("Please connect wallet first".to_string())
            }
        }
    }
}

impl AppError {
    /// Text shown in the transient transaction banner. `action` prefixes
    /// failures that have no dedicated wording, e.g. "Creation failed".
    pub fn user_message(&self, action: &str) -> String {
        match self {
            AppError::WalletRejected => "Transaction rejected by user".to_string(),
            AppError::EventFull { .. } => "Event is full".to_string(),
            AppError::EventNotFound(_) => "Event not found".to_string(),
            other => format!("{action}: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_unavailable_maps_to_taxonomy() {
        let err: AppError = StoreError::Unavailable.into();
        assert!(matches!(err, AppError::StoreUnavailable));

        let err: AppError = StoreError::Database("locked".into()).into();
        assert!(matches!(err, AppError::Unknown(msg) if msg.contains("locked")));
    }

    #[test]
    fn wallet_rejection_is_a_cancellation() {
        let err: AppError = WalletError::Rejected.into();
        assert!(matches!(err, AppError::WalletRejected));
        assert_eq!(err.user_message("Creation failed"), "Transaction rejected by user");
    }

    #[test]
    fn user_message_prefixes_generic_failures() {
        let err = AppError::Unknown("boom".into());
        assert_eq!(err.user_message("Creation failed"), "Creation failed: boom");

        let full = AppError::EventFull {
            event_id: "1-abc".into(),
            max: 2,
        };
        assert_eq!(full.user_message("Join failed"), "Event is full");
    }
}
