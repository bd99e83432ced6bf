//! # Asset Bridge Core
//!
//! Pure primitives for replicating assets between independently administered
//! content stores.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Asset`] - An immutable payload plus its metadata
//! - [`ObjectId`] - Opaque identifier, unique within one store
//! - [`Endpoint`] - Address of a domain's store
//! - [`QualifiedId`] - An [`ObjectId`] re-keyed with its origin endpoint
//! - [`ContentKind`] - Discriminator used when discovering references
//!
//! ## Namespacing
//!
//! Objects crossing a domain boundary are re-keyed as `<endpoint>/<id>`.
//! See the [`namespace`] module.

pub mod asset;
pub mod codec;
pub mod error;
pub mod namespace;
pub mod types;

pub use asset::{Asset, AssetBuilder, AssetFlags, ContentKind};
pub use codec::{decode_asset, encode_asset, WIRE_VERSION};
pub use error::{CoreError, Result};
pub use namespace::{qualify, unqualify, QualifiedId, SEPARATOR};
pub use types::{ContentHash, Endpoint, ObjectId};
