//! Error types for the bridge.

use assetbridge_sync::ReplicationError;
use thiserror::Error;

/// Errors that can occur during bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A replication call failed for its root.
    #[error("replication error: {0}")]
    Replication(#[from] ReplicationError),
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
