//! Error taxonomy for rate fetching, storage and conversion

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    /// The rate endpoint could not be reached or answered with a non-2xx status.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be read as a rates mapping.
    #[error("Format error: {0}")]
    Format(String),

    /// The key-value store failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

pub type Result<T, E = RateError> = std::result::Result<T, E>;
