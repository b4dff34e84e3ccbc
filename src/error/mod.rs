use thiserror::Error;
use uuid::Uuid;

use crate::notification::{Channel, NotificationStatus};

/// Errors produced by the dispatch engine and its collaborators.
///
/// Validation, not-found and invalid-state errors are reported without
/// touching the store. Delivery errors (`ExternalService`,
/// `UnsupportedChannel`) additionally leave the notification behind in
/// `Failed` status so status and history queries stay accurate.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification {0} not found")]
    NotFound(Uuid),

    #[error("Cannot retry notification in status {status}")]
    InvalidState { status: NotificationStatus },

    #[error("Maximum retries exceeded ({max})")]
    RetriesExhausted { max: u32 },

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Channel not supported: {0}")]
    UnsupportedChannel(Channel),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl DispatchError {
    /// Whether this error corresponds to a stored `Failed` record.
    ///
    /// Pre-dispatch errors (validation, not-found, invalid-state) never
    /// create or mutate a record; delivery-class errors always do.
    pub fn is_delivery_error(&self) -> bool {
        matches!(
            self,
            DispatchError::ExternalService(_) | DispatchError::UnsupportedChannel(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DispatchError::Validation("recipient cannot be empty".to_string());
        assert_eq!(err.to_string(), "Validation error: recipient cannot be empty");

        let err = DispatchError::InvalidState {
            status: NotificationStatus::Sent,
        };
        assert_eq!(err.to_string(), "Cannot retry notification in status Sent");

        let err = DispatchError::RetriesExhausted { max: 3 };
        assert_eq!(err.to_string(), "Maximum retries exceeded (3)");

        let err = DispatchError::UnsupportedChannel(Channel::Push);
        assert_eq!(err.to_string(), "Channel not supported: push");
    }

    #[test]
    fn test_delivery_error_classification() {
        assert!(DispatchError::ExternalService("smtp down".into()).is_delivery_error());
        assert!(DispatchError::UnsupportedChannel(Channel::Sms).is_delivery_error());
        assert!(!DispatchError::Validation("blank".into()).is_delivery_error());
        assert!(!DispatchError::NotFound(Uuid::nil()).is_delivery_error());
    }
}
