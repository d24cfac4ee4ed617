//! Error types for tailormade-sync

use thiserror::Error;

/// Result type alias using tailormade-sync's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sync engine operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local store error
    #[error("Storage error: {0}")]
    Storage(#[from] libsql::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request failed to complete (timeout, connectivity loss, transport)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Bearer credential rejected (HTTP 401); surfaced to the caller, never retried here
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Request rejected by the server (4xx other than 401, e.g. a stale reference)
    #[error("Rejected by server: {message} ({status})")]
    Rejected { status: u16, message: String },

    /// Any other non-2xx response
    #[error("Server error: {message} ({status})")]
    Http { status: u16, message: String },

    /// A sync pass is already running
    #[error("A sync pass is already in flight")]
    SyncInFlight,

    /// Record not found in the local snapshot
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether a future sync attempt may succeed without operator action.
    ///
    /// `Auth` needs a fresh credential and `Rejected` needs the offending
    /// payload fixed; everything network-shaped is worth a plain retry.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http { .. } | Self::SyncInFlight
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_is_not_retryable() {
        let err = Error::Rejected {
            status: 422,
            message: "stale reference".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn http_and_in_flight_are_retryable() {
        let err = Error::Http {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_retryable());
        assert!(Error::SyncInFlight.is_retryable());
    }
}
