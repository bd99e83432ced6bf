//! # Asset Bridge Store
//!
//! Storage abstraction for assets. The replicator only ever talks to the
//! [`AssetStore`] trait; [`SqliteStore`] is the persistent backend and
//! [`MemoryStore`] backs tests and in-process domains.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use assetbridge_core::{AssetBuilder, ContentKind};
//! use assetbridge_store::{AssetStore, PutResult, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("assets.db").unwrap();
//!
//!     let asset = AssetBuilder::new("0b5e0b4c-7a0a-4b8e-9a6f-2d1f3c4b5a69", ContentKind::Texture)
//!         .data(vec![0u8; 16])
//!         .build();
//!
//!     assert_eq!(store.put(&asset).await.unwrap(), PutResult::Inserted);
//!     assert_eq!(store.put(&asset).await.unwrap(), PutResult::Unchanged);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent puts**: storing identical content under the same id is a no-op
//! - **Last write wins**: different content under an existing id overwrites it
//! - **No deletion**: retention policy belongs to whoever owns the store

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AssetStore, PutResult};
