//! Error types for the sync daemon client.
//!
//! # Design
//! Only failures that happen on this side of the wire are errors: the request
//! never got an answer (`Transport`) or the answer was not JSON (`Decode`).
//! When the daemon itself reports a problem it does so inside valid JSON, and
//! that value reaches the caller untouched as a `Reply`, never as an `ApiError`.

use thiserror::Error;

/// Errors returned by `SyncControlClient` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The GET could not be completed: connection refused, connect timeout,
    /// DNS failure, or the body could not be read.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body is not valid JSON.
    #[error("response is not valid JSON: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cause() {
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport failed: connection refused");

        let err = ApiError::Decode("expected value at line 1 column 1".to_string());
        assert!(err.to_string().starts_with("response is not valid JSON"));
    }
}
