//! # Asset Bridge
//!
//! Federated asset replication: copy an asset and everything it references
//! between independently administered stores.
//!
//! ## Overview
//!
//! - **Fetch** pulls a graph from a remote domain into the local store
//! - **Publish** pushes a graph from the local store to a remote domain,
//!   re-keying every copy with the destination endpoint
//! - **Batches** replicate many roots, one result per root
//!
//! ## Key Concepts
//!
//! - **Asset**: Immutable payload plus metadata. Never edited in place.
//! - **Qualified id**: `<endpoint>/<id>`, unique across domains.
//! - **Reference graph**: Ids transitively embedded in a root's payload.
//! - **Report**: What happened to every object of one graph.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use assetbridge::{AssetBridge, BridgeConfig};
//! use assetbridge::core::Endpoint;
//! use assetbridge::store::SqliteStore;
//! use assetbridge::sync::{MemoryNetwork, ReferenceScanner};
//!
//! async fn example() -> assetbridge::Result<()> {
//!     let store = SqliteStore::open("assets.db").unwrap();
//!     let network = MemoryNetwork::new();
//!
//!     let bridge = AssetBridge::new(
//!         store,
//!         network.transport(),
//!         ReferenceScanner::new(),
//!         BridgeConfig::default(),
//!     );
//!
//!     let report = bridge
//!         .fetch_qualified("http://grid.example:8002/5748decc-f629-461c-9a36-a35a236fe36f")
//!         .await?;
//!     println!("stored {} assets", report.count());
//!
//!     let published = bridge
//!         .publish_graph(&report.root, &Endpoint::new("http://other.example:8002"))
//!         .await?;
//!     println!("published {} assets", published.count());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `assetbridge::core` - Identifiers, assets, namespacing, codec
//! - `assetbridge::store` - Storage abstraction, memory and SQLite stores
//! - `assetbridge::sync` - Transport, discovery, replicator

pub mod bridge;
pub mod error;

pub use assetbridge_core as core;
pub use assetbridge_store as store;
pub use assetbridge_sync as sync;

pub use bridge::{AssetBridge, BatchEntry, BridgeConfig};
pub use error::{BridgeError, Result};

pub use assetbridge_core::{
    qualify, unqualify, Asset, AssetBuilder, AssetFlags, ContentKind, Endpoint, ObjectId,
    QualifiedId,
};
pub use assetbridge_sync::{Direction, Outcome, ReplicationError, ReplicationReport};
