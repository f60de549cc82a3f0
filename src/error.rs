//! Error types for trellis convergence operations

use thiserror::Error;

/// Main error type for convergence operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No resource matched the expected criteria (tag, owning VPC, or name).
    /// Never retried internally; the outer reconcile loop decides whether to
    /// re-invoke.
    #[error("not found: {0}")]
    NotFound(String),

    /// A bounded poll exhausted its budget without a successful listing.
    /// The message carries the last underlying failure, if any.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Provider API call failure (list, create, authorize)
    #[error("provider error: {0}")]
    Provider(String),

    /// Cluster identity or name derivation failure
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a not-found error with the given message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a timeout error with the given message
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a provider error with the given message
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a configuration error with the given message
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Prefix the error message with a description of the step that failed,
    /// keeping the error variant intact so callers can still match on it.
    pub fn context(self, step: impl Into<String>) -> Self {
        let step = step.into();
        match self {
            Self::NotFound(msg) => Self::NotFound(format!("{step}: {msg}")),
            Self::Timeout(msg) => Self::Timeout(format!("{step}: {msg}")),
            Self::Provider(msg) => Self::Provider(format!("{step}: {msg}")),
            Self::Configuration(msg) => Self::Configuration(format!("{step}: {msg}")),
        }
    }
}
