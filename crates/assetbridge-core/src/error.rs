//! Error types for Asset Bridge Core.

use thiserror::Error;

/// Core errors raised by identifier handling and the wire codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An endpoint or object identifier was empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A qualified identifier could not be built or parsed unambiguously.
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
