//! Error taxonomy shared by every EZA crate

use thiserror::Error;

/// Errors crossing EZA component boundaries.
///
/// Only transport-class errors are ever surfaced to callers of the public
/// API; the rest are recovered locally and converted into degraded data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EzaError {
    /// Input to the normalizer was not a usable object.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Network or stream failure.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The backend answered, but reported an error.
    #[error("Backend error: {0}")]
    BackendError(String),

    /// A partial message arrived for a request that is already complete.
    #[error("Stale update for completed request {0}")]
    StaleUpdate(String),

    /// A single message could not be parsed.
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// The backend stayed silent for longer than the configured timeout.
    #[error("Timed out after {0} ms waiting for the analysis backend")]
    Timeout(u64),

    /// Invalid or unloadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EzaError {
    /// Whether this error belongs to the transport class that callers see.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            EzaError::TransportFailure(_) | EzaError::BackendError(_) | EzaError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for EzaError {
    fn from(err: serde_json::Error) -> Self {
        EzaError::ParseFailure(err.to_string())
    }
}

/// Result type for EZA operations.
pub type EzaResult<T> = Result<T, EzaError>;
