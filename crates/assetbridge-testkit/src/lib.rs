//! # Asset Bridge Testkit
//!
//! Testing utilities for Asset Bridge.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: An in-memory [`Federation`] of domains and an
//!   [`AssetFactory`] minting linked asset graphs
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use assetbridge_testkit::fixtures::AssetFactory;
//!
//! let mut factory = AssetFactory::with_seed(42);
//! let graph = factory.scene_graph(3);
//! assert_eq!(graph.asset_count(), 6);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use assetbridge_testkit::generators::{asset_from_params, AssetParams};
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_deterministic(params: AssetParams) {
//!         let a = asset_from_params(&params);
//!         let b = asset_from_params(&params);
//!         prop_assert_eq!(a.content_hash(), b.content_hash());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{scene_payload, AssetFactory, AssetGraph, Federation};
pub use generators::{asset_from_params, AssetParams};
