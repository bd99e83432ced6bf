//! Assets: immutable payloads plus metadata.
//!
//! An [`Asset`] is never edited in place. Re-keying an asset for another
//! domain produces a new value via [`Asset::requalified`]; the payload is
//! shared (`Bytes` is reference counted), not copied.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::{ContentHash, ObjectId};

/// Domain tag mixed into every content hash.
const CONTENT_DOMAIN: &[u8] = b"assetbridge-content-v0:";

/// How an asset's payload should be interpreted when discovering references.
///
/// Discriminants follow the grid asset type numbering so they survive a
/// round trip through stores that persist the raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContentKind {
    Texture = 0,
    Sound = 1,
    CallingCard = 2,
    Landmark = 3,
    Clothing = 5,
    SceneObject = 6,
    Notecard = 7,
    Script = 10,
    ScriptBytecode = 11,
    Bodypart = 13,
    Animation = 20,
    Gesture = 21,
    Mesh = 49,
    Material = 57,
}

impl ContentKind {
    /// Convert from the raw code. Returns `None` for unknown codes.
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(ContentKind::Texture),
            1 => Some(ContentKind::Sound),
            2 => Some(ContentKind::CallingCard),
            3 => Some(ContentKind::Landmark),
            5 => Some(ContentKind::Clothing),
            6 => Some(ContentKind::SceneObject),
            7 => Some(ContentKind::Notecard),
            10 => Some(ContentKind::Script),
            11 => Some(ContentKind::ScriptBytecode),
            13 => Some(ContentKind::Bodypart),
            20 => Some(ContentKind::Animation),
            21 => Some(ContentKind::Gesture),
            49 => Some(ContentKind::Mesh),
            57 => Some(ContentKind::Material),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Whether payloads of this kind can embed references to other assets.
    ///
    /// Raw media is always a leaf of the reference graph.
    pub fn may_reference(self) -> bool {
        match self {
            ContentKind::Texture
            | ContentKind::Sound
            | ContentKind::CallingCard
            | ContentKind::Landmark
            | ContentKind::ScriptBytecode
            | ContentKind::Animation
            | ContentKind::Mesh => false,
            ContentKind::Clothing
            | ContentKind::SceneObject
            | ContentKind::Notecard
            | ContentKind::Script
            | ContentKind::Bodypart
            | ContentKind::Gesture
            | ContentKind::Material => true,
        }
    }
}

/// Lifecycle flags carried with an asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetFlags {
    /// Transient asset, not meant to outlive the session that created it.
    pub temporary: bool,
    /// The holding store is authoritative for this asset.
    pub local: bool,
}

impl AssetFlags {
    /// Temporary and not locally authoritative: never republished.
    pub fn is_ephemeral(&self) -> bool {
        self.temporary && !self.local
    }

    fn to_bits(self) -> u8 {
        (self.temporary as u8) | ((self.local as u8) << 1)
    }
}

/// An immutable payload plus metadata.
///
/// `id` is the key the asset is stored under and may be a qualified id once
/// the asset has crossed a domain boundary. `full_id` always carries the
/// identifier the asset was minted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    id: ObjectId,
    full_id: ObjectId,
    name: String,
    description: String,
    kind: ContentKind,
    creator_id: String,
    data: Bytes,
    flags: AssetFlags,
}

impl Asset {
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn full_id(&self) -> &ObjectId {
        &self.full_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn flags(&self) -> AssetFlags {
        self.flags
    }

    pub fn is_ephemeral(&self) -> bool {
        self.flags.is_ephemeral()
    }

    /// A copy of this asset stored under a different key.
    ///
    /// Every other field, including `full_id`, is carried over unchanged.
    pub fn requalified(&self, id: ObjectId) -> Asset {
        Asset {
            id,
            ..self.clone()
        }
    }

    /// Hash of everything except the storage key.
    ///
    /// Two assets with equal hashes are interchangeable; stores use this to
    /// tell an idempotent re-put from an overwrite.
    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(CONTENT_DOMAIN);
        for field in [
            self.full_id.as_str().as_bytes(),
            self.name.as_bytes(),
            self.description.as_bytes(),
            self.creator_id.as_bytes(),
            self.data.as_ref(),
        ] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        hasher.update(&[self.kind.to_u8(), self.flags.to_bits()]);
        ContentHash(*hasher.finalize().as_bytes())
    }
}

/// Builder for [`Asset`] values.
#[derive(Debug, Clone)]
pub struct AssetBuilder {
    id: ObjectId,
    full_id: Option<ObjectId>,
    name: String,
    description: String,
    kind: ContentKind,
    creator_id: String,
    data: Bytes,
    flags: AssetFlags,
}

impl AssetBuilder {
    /// Start an asset stored under `id`; `full_id` defaults to the same value.
    pub fn new(id: impl Into<ObjectId>, kind: ContentKind) -> Self {
        Self {
            id: id.into(),
            full_id: None,
            name: String::new(),
            description: String::new(),
            kind,
            creator_id: String::new(),
            data: Bytes::new(),
            flags: AssetFlags::default(),
        }
    }

    pub fn full_id(mut self, full_id: impl Into<ObjectId>) -> Self {
        self.full_id = Some(full_id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn creator(mut self, creator_id: impl Into<String>) -> Self {
        self.creator_id = creator_id.into();
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.flags.temporary = temporary;
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.flags.local = local;
        self
    }

    pub fn flags(mut self, flags: AssetFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn build(self) -> Asset {
        let full_id = self.full_id.unwrap_or_else(|| self.id.clone());
        Asset {
            id: self.id,
            full_id,
            name: self.name,
            description: self.description,
            kind: self.kind,
            creator_id: self.creator_id,
            data: self.data,
            flags: self.flags,
        }
    }
}
