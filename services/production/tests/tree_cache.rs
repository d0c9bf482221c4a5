//! End-to-end tree cache scenarios against the in-memory backend.

use std::sync::Arc;

use rust_decimal::Decimal;

use bomforge_database::{BillOfMaterialStore, InMemoryBomStore, InMemoryTreeCache, Stores};
use bomforge_models::BillOfMaterial;
use bomforge_production::BillOfMaterialService;
use bomforge_utils::TreeConfig;

struct TestContext {
    service: BillOfMaterialService,
    boms: InMemoryBomStore,
    cache: InMemoryTreeCache,
}

impl TestContext {
    fn new() -> Self {
        let boms = InMemoryBomStore::new();
        let cache = InMemoryTreeCache::new();
        let stores = Stores {
            boms: Arc::new(boms.clone()),
            tree_cache: Arc::new(cache.clone()),
        };
        Self {
            service: BillOfMaterialService::new(stores, TreeConfig { sweep_orphans: false }),
            boms,
            cache,
        }
    }

    async fn save(&self, bom: &BillOfMaterial) -> BillOfMaterial {
        self.boms.save(bom).await.unwrap()
    }
}

#[tokio::test]
async fn test_cycle_back_to_root() {
    let ctx = TestContext::new();
    let mut r = BillOfMaterial::new("R", Decimal::ONE);
    let mut x = BillOfMaterial::new("X", Decimal::ONE);
    let y = BillOfMaterial::new("Y", Decimal::ONE);
    r.add_child(x.id);
    r.add_child(y.id);
    x.add_child(r.id);
    ctx.save(&r).await;
    ctx.save(&x).await;
    ctx.save(&y).await;

    let generation = ctx.service.generate_tree(r.id).await.unwrap();
    assert_eq!(generation.stats.created, 3);
    assert_eq!(generation.stats.revisited, 1);
    assert_eq!(ctx.cache.len().await, 3);

    let view = ctx.service.cached_tree(r.id).await.unwrap();
    let x_node = view.find(x.id).unwrap();
    assert_eq!(x_node.node.parent_bom_id, Some(r.id));
    assert!(x_node.children.is_empty());
    assert!(view.find(y.id).is_some());
}

#[tokio::test]
async fn test_regeneration_follows_structure_edits() {
    let ctx = TestContext::new();
    let screw = ctx.save(&BillOfMaterial::new("Screw", Decimal::new(8, 0))).await;
    let panel = ctx.save(&BillOfMaterial::new("Panel", Decimal::ONE)).await;
    let mut cabinet = BillOfMaterial::new("Cabinet", Decimal::ONE);
    cabinet.add_child(screw.id);
    cabinet.add_child(panel.id);
    let mut cabinet = ctx.save(&cabinet).await;

    ctx.service.generate_tree(cabinet.id).await.unwrap();
    assert_eq!(ctx.cache.len().await, 3);

    // Drop a child and change a quantity, then regenerate
    cabinet.remove_child(panel.id);
    ctx.save(&cabinet).await;
    let mut screw = screw;
    screw.qty = Decimal::new(12, 0);
    ctx.save(&screw).await;

    let generation = ctx.service.generate_tree(cabinet.id).await.unwrap();
    assert_eq!(generation.stats.created, 0);
    assert_eq!(generation.stats.updated, 2);
    assert_eq!(generation.stats.deleted, 1);

    let view = ctx.service.cached_tree(cabinet.id).await.unwrap();
    assert_eq!(view.node_count(), 2);
    assert_eq!(view.find(screw.id).unwrap().node.qty, Decimal::new(12, 0));
    assert!(view.find(panel.id).is_none());
}

#[tokio::test]
async fn test_versions_across_branches() {
    let ctx = TestContext::new();
    let base = ctx.save(&BillOfMaterial::new("Shelf", Decimal::ONE)).await;
    let v2 = ctx.service.generate_new_version(base.id).await.unwrap();
    let v3 = ctx.service.generate_new_version(base.id).await.unwrap();
    let v4 = ctx.service.generate_new_version(v2.id).await.unwrap();

    assert_eq!(v3.version_number, 3);
    assert_eq!(v4.version_number, 4);
    assert_eq!(ctx.service.resolve_latest_version(v3.id).await.unwrap(), 4);
    assert_eq!(
        BillOfMaterialService::file_name(&v4),
        "Bill of Material-Shelf-V4"
    );
}
