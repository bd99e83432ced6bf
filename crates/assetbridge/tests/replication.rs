//! End-to-end replication between in-memory domains.

use std::collections::HashSet;
use std::time::Duration;

use assetbridge::store::{AssetStore, MemoryStore, SqliteStore};
use assetbridge::sync::{CacheConfig, Faults, MemoryTransport, ReferenceScanner};
use assetbridge::{
    Asset, AssetBridge, BridgeConfig, BridgeError, ContentKind, Endpoint, ObjectId, ReplicationError,
};
use assetbridge_testkit::{AssetFactory, Federation};

const ORIGIN: &str = "http://origin.example:8002";
const DEST: &str = "http://dest.example:8002";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn bridge_with<S: AssetStore>(
    store: S,
    federation: &Federation,
    config: BridgeConfig,
) -> AssetBridge<S, MemoryTransport, ReferenceScanner> {
    AssetBridge::new(store, federation.transport(), ReferenceScanner::new(), config)
}

fn bridge(federation: &Federation) -> AssetBridge<MemoryStore, MemoryTransport, ReferenceScanner> {
    bridge_with(MemoryStore::new(), federation, BridgeConfig::default())
}

#[tokio::test]
async fn fetch_scene_graph() {
    init_tracing();
    let graph = AssetFactory::with_seed(1).scene_graph(3);
    let mut federation = Federation::new();
    let origin = federation.add_domain(ORIGIN, graph.assets()).await;
    let bridge = bridge(&federation);

    let report = bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();

    assert_eq!(report.count(), graph.asset_count());
    assert!(report.is_complete());

    let mut expected: Vec<ObjectId> = graph.assets().iter().map(|a| a.id().clone()).collect();
    expected.sort();
    assert_eq!(bridge.store().ids().await.unwrap(), expected);

    // Fetched objects keep their origin ids and content.
    for asset in graph.assets() {
        let local = bridge.store().get(asset.id()).await.unwrap().unwrap();
        assert_eq!(local, asset);
    }
}

#[tokio::test]
async fn fetch_twice_is_idempotent() {
    init_tracing();
    let graph = AssetFactory::with_seed(2).scene_graph(2);
    let mut federation = Federation::new();
    let origin = federation.add_domain(ORIGIN, graph.assets()).await;
    let bridge = bridge(&federation);

    let first = bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();
    let after_first = bridge.store().ids().await.unwrap();
    let second = bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();

    assert_eq!(first.count(), second.count());
    assert_eq!(bridge.store().ids().await.unwrap(), after_first);
}

#[tokio::test]
async fn fetch_tolerates_missing_dependencies() {
    init_tracing();
    let graph = AssetFactory::with_seed(3).scene_graph(4);
    let absent = graph.dependencies[0].id().clone();
    let held: Vec<_> = graph
        .assets()
        .into_iter()
        .filter(|a| a.id() != &absent)
        .collect();

    let mut federation = Federation::new();
    let origin = federation.add_domain(ORIGIN, held).await;
    let bridge = bridge(&federation);

    let report = bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();

    assert_eq!(report.count(), graph.asset_count() - 1);
    assert_eq!(report.missing, vec![absent]);
}

#[tokio::test]
async fn fetch_missing_root_fails() {
    init_tracing();
    let mut federation = Federation::new();
    let origin = federation.add_domain(ORIGIN, Vec::<Asset>::new()).await;
    let bridge = bridge(&federation);

    let err = bridge
        .fetch_graph(&ObjectId::random(), &origin)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Replication(ReplicationError::AssetNotFound { .. })
    ));
    assert_eq!(bridge.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn fetch_qualified_id() {
    init_tracing();
    let graph = AssetFactory::with_seed(4).scene_graph(1);
    let mut federation = Federation::new();
    federation.add_domain(ORIGIN, graph.assets()).await;
    let bridge = bridge(&federation);

    let qualified = format!("{}/{}", ORIGIN, graph.root_id());
    let report = bridge.fetch_qualified(&qualified).await.unwrap();
    assert_eq!(report.endpoint, Endpoint::new(ORIGIN));
    assert_eq!(report.count(), graph.asset_count());

    let err = bridge.fetch_qualified("no-separator").await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Replication(ReplicationError::MalformedIdentifier(_))
    ));
}

#[tokio::test]
async fn publish_requalifies_and_skips_ephemeral() {
    init_tracing();
    let mut factory = AssetFactory::with_seed(5);
    let texture = factory.texture();
    let baked = factory.ephemeral_texture();
    let root = factory.linking(ContentKind::SceneObject, &[&texture, &baked]);

    let mut federation = Federation::new();
    let dest = federation.add_domain(DEST, Vec::<Asset>::new()).await;
    let local = MemoryStore::with_assets([root.clone(), texture.clone(), baked.clone()]);
    let bridge = bridge_with(local, &federation, BridgeConfig::default());

    let report = bridge.publish_graph(root.id(), &dest).await.unwrap();

    assert_eq!(report.count(), 2);
    assert_eq!(report.skipped, vec![baked.id().clone()]);

    let remote = federation.store(&dest).unwrap();
    let mut expected = vec![
        ObjectId::new(format!("{}/{}", DEST, root.id())),
        ObjectId::new(format!("{}/{}", DEST, texture.id())),
    ];
    expected.sort();
    assert_eq!(remote.ids().await.unwrap(), expected);

    let copy = remote.get(&expected[0]).await.unwrap().unwrap();
    assert!(copy.full_id() == root.id() || copy.full_id() == texture.id());
}

#[tokio::test]
async fn publish_is_idempotent() {
    init_tracing();
    let graph = AssetFactory::with_seed(6).scene_graph(2);
    let mut federation = Federation::new();
    let dest = federation.add_domain(DEST, Vec::<Asset>::new()).await;
    let local = MemoryStore::with_assets(graph.assets());
    let bridge = bridge_with(local, &federation, BridgeConfig::default());

    let published = bridge.publish_graph(graph.root_id(), &dest).await.unwrap();
    assert_eq!(published.count(), graph.asset_count());

    // Publishing again leaves the destination unchanged.
    let remote = federation.store(&dest).unwrap();
    let before = remote.ids().await.unwrap();
    bridge.publish_graph(graph.root_id(), &dest).await.unwrap();
    assert_eq!(remote.ids().await.unwrap(), before);
}

#[tokio::test]
async fn batch_continues_after_failure() {
    init_tracing();
    let mut factory = AssetFactory::with_seed(7);
    let a = factory.scene_graph(1);
    let b = factory.scene_graph(2);
    let missing = factory.next_id();

    let mut federation = Federation::new();
    let origin = federation
        .add_domain(ORIGIN, a.assets().into_iter().chain(b.assets()))
        .await;
    let bridge = bridge(&federation);

    let roots = vec![a.root_id().clone(), missing.clone(), b.root_id().clone()];
    let entries = bridge.fetch_all(roots.clone(), &origin).await;

    let returned: Vec<_> = entries.iter().map(|e| e.root.clone()).collect();
    assert_eq!(returned, roots);
    assert_eq!(entries[0].result.as_ref().unwrap().count(), a.asset_count());
    assert!(entries[1].result.is_err());
    assert_eq!(entries[2].result.as_ref().unwrap().count(), b.asset_count());
    assert_eq!(
        bridge.store().count().await.unwrap(),
        a.asset_count() + b.asset_count()
    );
}

#[tokio::test]
async fn publish_all_reports_per_root() {
    init_tracing();
    let mut factory = AssetFactory::with_seed(8);
    let a = factory.scene_graph(1);
    let b = factory.scene_graph(1);

    let mut federation = Federation::new();
    let dest = federation.add_domain(DEST, Vec::<Asset>::new()).await;
    let local = MemoryStore::with_assets(a.assets().into_iter().chain(b.assets()));
    let bridge = bridge_with(local, &federation, BridgeConfig::default());

    let entries = bridge
        .publish_all([a.root_id().clone(), b.root_id().clone()], &dest)
        .await;
    assert!(entries.iter().all(|e| e.result.is_ok()));
    assert_eq!(
        federation.store(&dest).unwrap().count().await.unwrap(),
        a.asset_count() + b.asset_count()
    );
}

#[tokio::test]
async fn each_object_requested_once() {
    init_tracing();
    let graph = AssetFactory::with_seed(9).scene_graph(3);
    let mut federation = Federation::new();
    let origin = federation.add_domain(ORIGIN, graph.assets()).await;

    let bridge = bridge(&federation);
    bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();

    let gets = federation.network().requests(&origin).gets;
    let unique: HashSet<_> = gets.iter().collect();
    assert_eq!(gets.len(), unique.len());
    assert_eq!(gets.len(), graph.asset_count());
}

#[tokio::test]
async fn retry_finds_dependency_added_later() {
    init_tracing();
    let cached = BridgeConfig {
        cache: CacheConfig {
            ttl: Duration::from_secs(30),
        },
        ..BridgeConfig::default()
    };

    for config in [BridgeConfig::default(), cached] {
        let graph = AssetFactory::with_seed(12).scene_graph(2);
        let late = graph.dependencies[0].clone();
        let held: Vec<_> = graph
            .assets()
            .into_iter()
            .filter(|a| a.id() != late.id())
            .collect();

        let mut federation = Federation::new();
        let origin = federation.add_domain(ORIGIN, held).await;
        let bridge = bridge_with(MemoryStore::new(), &federation, config);

        let first = bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();
        assert_eq!(first.missing, vec![late.id().clone()]);

        federation.store(&origin).unwrap().put(&late).await.unwrap();
        let second = bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();

        assert!(second.is_complete());
        assert_eq!(second.count(), graph.asset_count());
        assert!(bridge.store().contains(late.id()).await.unwrap());
    }
}

#[tokio::test]
async fn retry_finds_root_added_later() {
    init_tracing();
    let graph = AssetFactory::with_seed(13).scene_graph(1);
    let mut federation = Federation::new();
    let origin = federation
        .add_domain(ORIGIN, graph.dependencies.clone())
        .await;
    let config = BridgeConfig {
        cache: CacheConfig {
            ttl: Duration::from_secs(30),
        },
        ..BridgeConfig::default()
    };
    let bridge = bridge_with(MemoryStore::new(), &federation, config);

    assert!(bridge.fetch_graph(graph.root_id(), &origin).await.is_err());

    federation.store(&origin).unwrap().put(&graph.root).await.unwrap();
    let report = bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();
    assert_eq!(report.count(), graph.asset_count());
}

#[tokio::test]
async fn dependency_outage_is_recorded() {
    init_tracing();
    let graph = AssetFactory::with_seed(10).scene_graph(2);
    let failing = graph.dependencies[1].id().clone();
    let mut federation = Federation::new();
    let origin = federation.add_domain(ORIGIN, graph.assets()).await;

    let mut faults = Faults::default();
    faults.failing_ids.insert(failing.clone());
    federation.set_faults(&origin, faults).await;

    let bridge = bridge(&federation);
    let report = bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();

    assert_eq!(report.count(), graph.asset_count() - 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, failing);
}

#[tokio::test]
async fn fetch_into_sqlite_store() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.db");
    let graph = AssetFactory::with_seed(11).scene_graph(2);
    let mut federation = Federation::new();
    let origin = federation.add_domain(ORIGIN, graph.assets()).await;

    {
        let store = SqliteStore::open(&path).unwrap();
        let bridge = bridge_with(store, &federation, BridgeConfig::default());
        let report = bridge.fetch_graph(graph.root_id(), &origin).await.unwrap();
        assert_eq!(report.count(), graph.asset_count());
    }

    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.count().await.unwrap(), graph.asset_count());
    assert_eq!(
        reopened.get(graph.root_id()).await.unwrap(),
        Some(graph.root.clone())
    );
}
