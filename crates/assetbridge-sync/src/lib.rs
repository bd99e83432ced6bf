//! # Asset Bridge Sync
//!
//! Replication of asset graphs between independently administered stores.
//!
//! ## Overview
//!
//! A [`Replicator`] copies a root asset and everything it transitively
//! references between the local store and a remote domain:
//!
//! - **fetch** pulls a graph from a remote endpoint into the local store,
//!   keeping every object's id.
//! - **publish** pushes a graph from the local store to a remote endpoint,
//!   re-keying every copy as `<destination>/<id>`.
//!
//! ## Key Properties
//!
//! - **Idempotent**: repeating a call leaves the destination unchanged
//! - **Partial-failure tolerant**: only the root can fail a call
//! - **Bounded**: transfers run concurrently up to a fixed limit, each with
//!   its own timeout
//! - **Cancellable**: cancellation stops dispatch and lets in-flight
//!   transfers settle
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use assetbridge_core::{Endpoint, ObjectId};
//! use assetbridge_store::MemoryStore;
//! use assetbridge_sync::{MemoryNetwork, ReferenceScanner, Replicator, ReplicatorConfig};
//!
//! async fn example() -> assetbridge_sync::Result<()> {
//!     let network = MemoryNetwork::new();
//!     let local = Arc::new(MemoryStore::new());
//!     let replicator = Replicator::new(
//!         local,
//!         network.transport(),
//!         ReferenceScanner::new(),
//!         ReplicatorConfig::default(),
//!     );
//!
//!     let origin = Endpoint::new("http://grid.example:8002");
//!     let outcome = replicator.fetch_graph(&ObjectId::new("root"), &origin).await?;
//!     println!("stored {} assets", outcome.count());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod replicator;
pub mod source;
pub mod transport;
pub mod visited;

pub use cache::CachedTransport;
pub use config::{CacheConfig, ReplicatorConfig};
pub use discovery::{scan_uuids, Discoverer, ReferenceScanner, StaticDiscoverer};
pub use error::{ReplicationError, Result, TransportError};
pub use replicator::{Direction, Outcome, ReplicationReport, Replicator};
pub use source::{AssetSource, LocalSource, RemoteSource};
pub use transport::{memory::Faults, memory::MemoryNetwork, memory::MemoryTransport, Transport};
pub use visited::VisitedSet;
