//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use assetbridge_core::{Asset, AssetBuilder, ContentKind, Endpoint, ObjectId};
use assetbridge_store::MemoryStore;
use assetbridge_sync::{Faults, MemoryNetwork, MemoryTransport};

/// A set of in-memory domains on one network.
pub struct Federation {
    network: Arc<MemoryNetwork>,
    stores: BTreeMap<Endpoint, Arc<MemoryStore>>,
}

impl Federation {
    pub fn new() -> Self {
        Self {
            network: MemoryNetwork::new(),
            stores: BTreeMap::new(),
        }
    }

    /// Serve a fresh store holding `assets` at `endpoint`.
    pub async fn add_domain(
        &mut self,
        endpoint: &str,
        assets: impl IntoIterator<Item = Asset>,
    ) -> Endpoint {
        let endpoint = Endpoint::new(endpoint);
        let store = Arc::new(MemoryStore::with_assets(assets));
        self.network.register(endpoint.clone(), store.clone()).await;
        self.stores.insert(endpoint.clone(), store);
        endpoint
    }

    pub fn store(&self, endpoint: &Endpoint) -> Option<&Arc<MemoryStore>> {
        self.stores.get(endpoint)
    }

    pub fn network(&self) -> &Arc<MemoryNetwork> {
        &self.network
    }

    pub fn transport(&self) -> MemoryTransport {
        self.network.transport()
    }

    pub async fn set_faults(&self, endpoint: &Endpoint, faults: Faults) {
        self.network.set_faults(endpoint, faults).await;
    }
}

impl Default for Federation {
    fn default() -> Self {
        Self::new()
    }
}

/// A root asset together with everything it references.
#[derive(Debug, Clone)]
pub struct AssetGraph {
    pub root: Asset,
    pub dependencies: Vec<Asset>,
}

impl AssetGraph {
    pub fn root_id(&self) -> &ObjectId {
        self.root.id()
    }

    /// Root first, then dependencies.
    pub fn assets(&self) -> Vec<Asset> {
        std::iter::once(self.root.clone())
            .chain(self.dependencies.iter().cloned())
            .collect()
    }

    pub fn asset_count(&self) -> usize {
        1 + self.dependencies.len()
    }
}

/// Mints assets with UUID ids, deterministically when seeded.
pub struct AssetFactory {
    rng: StdRng,
}

impl AssetFactory {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_id(&mut self) -> ObjectId {
        let uuid = uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid();
        ObjectId::from(uuid)
    }

    /// A raw media asset; never references anything.
    pub fn texture(&mut self) -> Asset {
        let id = self.next_id();
        let pixels: Vec<u8> = (0..64).map(|_| self.rng.gen()).collect();
        AssetBuilder::new(id, ContentKind::Texture)
            .name("texture")
            .creator(Uuid::nil().to_string())
            .data(pixels)
            .local(true)
            .build()
    }

    /// A transient texture from another session; never published.
    pub fn ephemeral_texture(&mut self) -> Asset {
        let id = self.next_id();
        AssetBuilder::new(id, ContentKind::Texture)
            .name("baked texture")
            .data(vec![0u8; 16])
            .temporary(true)
            .local(false)
            .build()
    }

    /// An asset of `kind` whose payload embeds the ids of `refs`.
    pub fn linking(&mut self, kind: ContentKind, refs: &[&Asset]) -> Asset {
        let id = self.next_id();
        let ids: Vec<&ObjectId> = refs.iter().map(|asset| asset.id()).collect();
        AssetBuilder::new(id, kind)
            .name(format!("{:?}", kind))
            .description("generated by the testkit")
            .data(scene_payload(&ids))
            .local(true)
            .build()
    }

    /// A scene object referencing `textures` textures and one notecard,
    /// which itself references one more texture.
    pub fn scene_graph(&mut self, textures: usize) -> AssetGraph {
        let mut dependencies: Vec<Asset> = (0..textures).map(|_| self.texture()).collect();
        let nested = self.texture();
        let notecard = self.linking(ContentKind::Notecard, &[&nested]);

        let mut refs: Vec<&Asset> = dependencies.iter().collect();
        refs.push(&notecard);
        let root = self.linking(ContentKind::SceneObject, &refs);

        dependencies.push(notecard);
        dependencies.push(nested);
        AssetGraph { root, dependencies }
    }
}

impl Default for AssetFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// A scene-like text payload embedding `refs`.
pub fn scene_payload(refs: &[&ObjectId]) -> Vec<u8> {
    let mut payload = String::from("<SceneObjectGroup>");
    for id in refs {
        payload.push_str("<Part><TextureID>");
        payload.push_str(id.as_str());
        payload.push_str("</TextureID></Part>");
    }
    payload.push_str("</SceneObjectGroup>");
    payload.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetbridge_store::AssetStore;
    use assetbridge_sync::scan_uuids;

    #[test]
    fn test_seeded_factory_deterministic() {
        let a = AssetFactory::with_seed(7).scene_graph(3);
        let b = AssetFactory::with_seed(7).scene_graph(3);
        assert_eq!(a.assets(), b.assets());
        assert_eq!(a.asset_count(), 6);
    }

    #[test]
    fn test_scene_payload_is_scannable() {
        let graph = AssetFactory::with_seed(1).scene_graph(2);
        let found = scan_uuids(graph.root.data());
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn test_federation_domains() {
        let mut factory = AssetFactory::with_seed(3);
        let mut federation = Federation::new();
        let endpoint = federation
            .add_domain("http://grid-a.example", [factory.texture()])
            .await;

        let store = federation.store(&endpoint).unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(federation
            .store(&Endpoint::new("http://unknown"))
            .is_none());
    }
}
