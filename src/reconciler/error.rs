//! Error types for the reconciliation system
//!
//! This module defines the error taxonomy for provider calls and
//! reconciliation passes.

use thiserror::Error;

/// Typed outcome of a membership provider call
///
/// Permission and not-found conditions are represented explicitly so the
/// reconciler can inspect them instead of relying on catch-and-ignore
/// control flow.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The community is unknown to the provider. Skipped, never logged as
    /// an error.
    #[error("community {0} is not reachable")]
    NotReachable(u64),

    /// The target of the call does not exist (user already absent)
    #[error("target not found")]
    NotFound,

    /// The bot lacks permission for the call
    #[error("insufficient permission")]
    Forbidden,

    /// Connectivity or API failure while talking to the provider
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can abort a reconciler operation outright
///
/// Per-target provider failures are handled inside the loops and never
/// surface here; these cover the store and the audit log.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Provider failure outside a tolerant loop (e.g. the opt-in snapshot)
    #[error("membership provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Failed to serialize persisted state
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// Failed to read or write persisted state
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for reconciler operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let error = ProviderError::NotReachable(42);
        assert_eq!(error.to_string(), "community 42 is not reachable");

        let error = ProviderError::NotFound;
        assert_eq!(error.to_string(), "target not found");

        let error = ProviderError::Forbidden;
        assert_eq!(error.to_string(), "insufficient permission");

        let error = ProviderError::Unavailable("connection reset".to_string());
        assert_eq!(error.to_string(), "provider unavailable: connection reset");
    }

    #[test]
    fn test_reconcile_error_from_provider() {
        let error = ReconcileError::from(ProviderError::Forbidden);
        assert_eq!(
            error.to_string(),
            "membership provider error: insufficient permission"
        );
    }
}
