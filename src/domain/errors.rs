//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Transient store failure (connection loss, timeout, 5xx). Worth retrying.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store refused the request (bad path, permission, 4xx). Retrying won't help.
    #[error("Store rejected request: {0}")]
    StoreRejected(String),

    #[error("Malformed record {path}/{key}: {reason}")]
    MalformedRecord {
        path: String,
        key: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),
}

impl DomainError {
    /// True for failures a retry with backoff may fix.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DomainError::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_recoverable() {
        assert!(DomainError::StoreUnavailable("timeout".into()).is_recoverable());
        assert!(!DomainError::StoreRejected("401".into()).is_recoverable());
        assert!(!DomainError::Input("bad".into()).is_recoverable());
    }
}
