use thiserror::Error;

/// Error taxonomy for the tracker core.
///
/// Missing data is not an error anywhere in this crate: absent provider
/// fields propagate as `None` through derivation instead of raising.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Rejected synchronously, never silently coerced (e.g. an FCF year
    /// outside the supported range).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An update targeted a ticker with no stored record.
    #[error("ticker '{0}' not found")]
    NotFound(String),

    /// Remote provider failure for a single ticker. Caught and counted at
    /// the refresh/ingestion boundary, never aborts a batch.
    #[error("provider failure: {0}")]
    Provider(String),

    /// Persistence backend failure. Propagates to the immediate caller.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Provider(err.to_string())
    }
}
