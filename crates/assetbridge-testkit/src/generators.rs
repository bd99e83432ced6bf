//! Proptest generators for property-based testing.

use proptest::prelude::*;
use uuid::Uuid;

use assetbridge_core::{Asset, AssetBuilder, AssetFlags, ContentKind, Endpoint, ObjectId};

/// Generate an endpoint URL.
pub fn endpoint() -> impl Strategy<Value = Endpoint> {
    "(http|https)://[a-z][a-z0-9-]{0,15}\\.example(:[0-9]{2,5})?(/[a-z]{1,8})?"
        .prop_map(Endpoint::new)
}

/// Generate a UUID object id.
pub fn object_id() -> impl Strategy<Value = ObjectId> {
    any::<[u8; 16]>().prop_map(|bytes| ObjectId::from(Uuid::from_bytes(bytes)))
}

/// Generate any separator-free object id.
pub fn raw_object_id() -> impl Strategy<Value = ObjectId> {
    "[!-.0-~]{1,40}".prop_map(ObjectId::new)
}

/// Generate a ContentKind.
pub fn content_kind() -> impl Strategy<Value = ContentKind> {
    prop_oneof![
        Just(ContentKind::Texture),
        Just(ContentKind::Sound),
        Just(ContentKind::CallingCard),
        Just(ContentKind::Landmark),
        Just(ContentKind::Clothing),
        Just(ContentKind::SceneObject),
        Just(ContentKind::Notecard),
        Just(ContentKind::Script),
        Just(ContentKind::ScriptBytecode),
        Just(ContentKind::Bodypart),
        Just(ContentKind::Animation),
        Just(ContentKind::Gesture),
        Just(ContentKind::Mesh),
        Just(ContentKind::Material),
    ]
}

pub fn flags() -> impl Strategy<Value = AssetFlags> {
    (any::<bool>(), any::<bool>()).prop_map(|(temporary, local)| AssetFlags { temporary, local })
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Parameters for generating an asset.
#[derive(Debug, Clone)]
pub struct AssetParams {
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    pub kind: ContentKind,
    pub creator_id: String,
    pub data: Vec<u8>,
    pub flags: AssetFlags,
}

impl Arbitrary for AssetParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            object_id(),
            "[a-zA-Z0-9 ]{0,24}",
            "[a-zA-Z0-9 .]{0,48}",
            content_kind(),
            object_id(),
            payload(512),
            flags(),
        )
            .prop_map(|(id, name, description, kind, creator, data, flags)| AssetParams {
                id,
                name,
                description,
                kind,
                creator_id: creator.to_string(),
                data,
                flags,
            })
            .boxed()
    }
}

/// Build an asset from parameters.
pub fn asset_from_params(params: &AssetParams) -> Asset {
    AssetBuilder::new(params.id.clone(), params.kind)
        .name(params.name.clone())
        .description(params.description.clone())
        .creator(params.creator_id.clone())
        .data(params.data.clone())
        .flags(params.flags)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetbridge_core::{qualify, unqualify};
    use assetbridge_sync::scan_uuids;

    proptest! {
        #[test]
        fn test_qualify_round_trip(endpoint in endpoint(), id in raw_object_id()) {
            let qualified = qualify(&endpoint, &id).unwrap();
            let (e, i) = unqualify(&qualified.to_string()).unwrap();
            prop_assert_eq!(e, endpoint);
            prop_assert_eq!(i, id);
        }

        #[test]
        fn test_content_hash_ignores_storage_key(params: AssetParams, endpoint in endpoint()) {
            let asset = asset_from_params(&params);
            let key = qualify(&endpoint, asset.id()).unwrap().to_object_id();
            let copy = asset.requalified(key);

            prop_assert_eq!(copy.content_hash(), asset.content_hash());
            prop_assert_eq!(copy.full_id(), asset.id());
            prop_assert_eq!(copy.data(), asset.data());
        }

        #[test]
        fn test_scan_finds_embedded_ids(
            ids in prop::collection::vec(object_id(), 0..8),
            filler in "[g-z <>/=\"]{1,16}",
        ) {
            let mut payload = String::new();
            for id in &ids {
                payload.push_str(&filler);
                payload.push_str(id.as_str());
            }
            payload.push_str(&filler);

            let found: Vec<ObjectId> = scan_uuids(payload.as_bytes())
                .into_iter()
                .map(ObjectId::from)
                .collect();
            let mut expected: Vec<ObjectId> = Vec::new();
            for id in ids {
                if !id.is_nil() && !expected.contains(&id) {
                    expected.push(id);
                }
            }
            prop_assert_eq!(found, expected);
        }
    }
}
