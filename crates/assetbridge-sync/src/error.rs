//! Error types for the sync module.

use std::time::Duration;

use assetbridge_core::{CoreError, Endpoint, ObjectId};
use assetbridge_store::StoreError;
use thiserror::Error;

/// Failures talking to a remote domain.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The endpoint could not be reached at all.
    #[error("endpoint unreachable: {0}")]
    Unreachable(Endpoint),

    /// The request did not settle within the configured timeout.
    #[error("request to {endpoint} timed out after {after:?}")]
    Timeout { endpoint: Endpoint, after: Duration },

    /// The endpoint answered with an error.
    #[error("rejected by {endpoint}: {reason}")]
    Rejected { endpoint: Endpoint, reason: String },

    /// The asset could not be encoded or decoded for the wire.
    #[error("codec error: {0}")]
    Codec(#[from] CoreError),
}

/// Errors that end a replication call.
///
/// Dependency-level failures never surface here; they are recorded in the
/// [`ReplicationReport`](crate::ReplicationReport) instead.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// The root object is absent at its source.
    #[error("asset {id} not found at {location}")]
    AssetNotFound { id: ObjectId, location: String },

    /// A caller-supplied identifier could not be parsed. Ids met while
    /// publishing are recorded in the report instead.
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// Transport failure while transferring the root.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Local store failure while handling the root.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The reference set of the root could not be discovered.
    #[error("discovery failed for {root}: {reason}")]
    Discovery { root: ObjectId, reason: String },

    /// The caller cancelled the call.
    #[error("replication cancelled after {completed} transfers")]
    Cancelled { completed: usize },
}

impl From<CoreError> for ReplicationError {
    fn from(e: CoreError) -> Self {
        ReplicationError::MalformedIdentifier(e.to_string())
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;
