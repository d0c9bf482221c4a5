//! Bill of Material Service
//!
//! Entry points for tree cache generation, version resolution and the BOM
//! copy operations built on top of them.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use bomforge_database::{BillOfMaterialStore, Stores, TreeCacheStore};
use bomforge_models::{BillOfMaterial, BomTreeView, TempBomTree};
use bomforge_utils::{validate_model, BomError, TreeConfig};

use crate::tree::{TreeBuilder, TreeGeneration};
use crate::version::VersionResolver;

#[derive(Clone)]
pub struct BillOfMaterialService {
    stores: Stores,
    config: TreeConfig,
}

impl BillOfMaterialService {
    pub fn new(stores: Stores, config: TreeConfig) -> Self {
        Self { stores, config }
    }

    /// Load a BOM or fail with `NotFound`
    pub async fn find(&self, bom_id: Uuid) -> Result<BillOfMaterial> {
        self.stores
            .boms
            .find_by_id(bom_id)
            .await?
            .ok_or_else(|| BomError::not_found(format!("Bill of material {}", bom_id)).into())
    }

    pub async fn boms_for_product(&self, product_id: Uuid) -> Result<Vec<BillOfMaterial>> {
        self.stores.boms.find_by_product(product_id).await
    }

    /// Materializes the tree cache of `bom_id` and returns its root row.
    pub async fn generate_tree(&self, bom_id: Uuid) -> Result<TreeGeneration> {
        let root = self.find(bom_id).await?;

        TreeBuilder::new(self.stores.boms.as_ref(), self.stores.tree_cache.as_ref())
            .with_orphan_sweep(self.config.sweep_orphans)
            .generate(&root)
            .await
    }

    /// Highest version number in the lineage of `bom_id`.
    pub async fn resolve_latest_version(&self, bom_id: Uuid) -> Result<i32> {
        let bom = self.find(bom_id).await?;
        VersionResolver::new(self.stores.boms.as_ref())
            .resolve_latest_version(&bom)
            .await
    }

    /// Copies `bom_id` into a new version numbered past every version in its
    /// lineage.
    pub async fn generate_new_version(&self, bom_id: Uuid) -> Result<BillOfMaterial> {
        let bom = self.find(bom_id).await?;
        let latest = VersionResolver::new(self.stores.boms.as_ref())
            .resolve_latest_version(&bom)
            .await?;

        let copy = bom.derive_version(latest + 1);
        validate_model(&copy)?;
        let saved = self
            .stores
            .boms
            .save(&copy)
            .await
            .context("Failed to save new bill of material version")?;

        info!(
            bom_id = %bom.id,
            new_bom_id = %saved.id,
            version_number = saved.version_number,
            "New bill of material version created"
        );
        Ok(saved)
    }

    /// Saves a personalized copy of `bom_id`.
    pub async fn customize(&self, bom_id: Uuid) -> Result<BillOfMaterial> {
        let bom = self.find(bom_id).await?;

        let mut copy = bom.duplicate();
        copy.personalized = true;
        copy.name = format!("{} (Personalized {})", bom.name, short_id(copy.id));
        validate_model(&copy)?;

        self.stores
            .boms
            .save(&copy)
            .await
            .context("Failed to save personalized bill of material")
    }

    /// Export file name for a BOM, with the version appended past the first.
    pub fn file_name(bom: &BillOfMaterial) -> String {
        if bom.version_number > 1 {
            format!("Bill of Material-{}-V{}", bom.name, bom.version_number)
        } else {
            format!("Bill of Material-{}", bom.name)
        }
    }

    /// Reads back the cached tree rooted at `bom_id`.
    ///
    /// Children are listed in the order of their parent BOM's `child_ids`.
    /// Rows whose BOM the parent no longer lists come last, oldest first.
    pub async fn cached_tree(&self, bom_id: Uuid) -> Result<BomTreeView> {
        let cache = &self.stores.tree_cache;
        let root = cache
            .find_node(bom_id, None)
            .await?
            .ok_or_else(|| BomError::not_found(format!("Bom tree for bill of material {}", bom_id)))?;

        let mut children: HashMap<Uuid, Vec<TempBomTree>> = HashMap::new();
        let mut seen: HashSet<Uuid> = HashSet::from([root.id]);
        let mut frontier: VecDeque<(Uuid, Option<Uuid>)> = VecDeque::from([(root.id, root.bom_id)]);

        while let Some((parent_id, parent_bom_id)) = frontier.pop_front() {
            let mut below: Vec<TempBomTree> = cache
                .find_by_parents(&[parent_id])
                .await?
                .into_iter()
                .filter(|child| seen.insert(child.id))
                .collect();
            if below.is_empty() {
                continue;
            }

            let source = match parent_bom_id {
                Some(id) => self.stores.boms.find_by_id(id).await?,
                None => None,
            };
            if let Some(source) = source {
                below.sort_by_key(|child| {
                    child
                        .bom_id
                        .and_then(|id| source.child_ids.iter().position(|c| *c == id))
                        .unwrap_or(usize::MAX)
                });
            }

            frontier.extend(below.iter().map(|child| (child.id, child.bom_id)));
            children.insert(parent_id, below);
        }

        Ok(assemble(root, &mut children))
    }
}

fn assemble(node: TempBomTree, children: &mut HashMap<Uuid, Vec<TempBomTree>>) -> BomTreeView {
    let below = children.remove(&node.id).unwrap_or_default();
    BomTreeView {
        node,
        children: below.into_iter().map(|child| assemble(child, children)).collect(),
    }
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomforge_database::{InMemoryBomStore, InMemoryTreeCache};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    struct Harness {
        service: BillOfMaterialService,
        boms: InMemoryBomStore,
        cache: InMemoryTreeCache,
    }

    fn harness(sweep_orphans: bool) -> Harness {
        let boms = InMemoryBomStore::new();
        let cache = InMemoryTreeCache::new();
        let stores = Stores {
            boms: Arc::new(boms.clone()),
            tree_cache: Arc::new(cache.clone()),
        };
        Harness {
            service: BillOfMaterialService::new(stores, TreeConfig { sweep_orphans }),
            boms,
            cache,
        }
    }

    async fn save(h: &Harness, bom: &BillOfMaterial) -> BillOfMaterial {
        h.boms.save(bom).await.unwrap()
    }

    #[tokio::test]
    async fn test_generate_and_read_tree() {
        let h = harness(false);
        let wheel = save(&h, &BillOfMaterial::new("Wheel", Decimal::new(2, 0))).await;
        let frame = save(&h, &BillOfMaterial::new("Frame", Decimal::ONE)).await;
        let mut bike = BillOfMaterial::new("Bike", Decimal::ONE);
        bike.add_child(wheel.id);
        bike.add_child(frame.id);
        let bike = save(&h, &bike).await;

        let generation = h.service.generate_tree(bike.id).await.unwrap();
        assert_eq!(generation.stats.created, 3);

        let view = h.service.cached_tree(bike.id).await.unwrap();
        assert_eq!(view.node.id, generation.root.id);
        assert_eq!(view.node_count(), 3);
        assert_eq!(view.depth(), 2);
        assert_eq!(view.find(wheel.id).unwrap().node.qty, Decimal::new(2, 0));
    }

    #[tokio::test]
    async fn test_cached_tree_follows_child_order() {
        let h = harness(false);
        let wheel = save(&h, &BillOfMaterial::new("Wheel", Decimal::new(2, 0))).await;
        let frame = save(&h, &BillOfMaterial::new("Frame", Decimal::ONE)).await;
        let mut bike = BillOfMaterial::new("Bike", Decimal::ONE);
        bike.add_child(wheel.id);
        bike.add_child(frame.id);
        let mut bike = save(&h, &bike).await;
        h.service.generate_tree(bike.id).await.unwrap();

        // Reordering keeps the existing rows but changes how they are listed
        bike.child_ids = vec![frame.id, wheel.id];
        save(&h, &bike).await;
        let generation = h.service.generate_tree(bike.id).await.unwrap();
        assert_eq!(generation.stats.created, 0);

        let view = h.service.cached_tree(bike.id).await.unwrap();
        let order: Vec<Option<Uuid>> = view.children.iter().map(|c| c.node.bom_id).collect();
        assert_eq!(order, vec![Some(frame.id), Some(wheel.id)]);
    }

    #[tokio::test]
    async fn test_cached_tree_requires_generation() {
        let h = harness(false);
        let bom = save(&h, &BillOfMaterial::new("Bike", Decimal::ONE)).await;

        let error = h.service.cached_tree(bom.id).await.unwrap_err();
        assert_eq!(BomError::from_anyhow(&error).http_status_code(), 404);
    }

    #[tokio::test]
    async fn test_unknown_bom_is_not_found() {
        let h = harness(false);
        let error = h.service.generate_tree(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(BomError::from_anyhow(&error).error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_sweep_configuration_is_applied() {
        let h = harness(true);
        let leaf = save(&h, &BillOfMaterial::new("Leaf", Decimal::ONE)).await;
        let mut mid = BillOfMaterial::new("Mid", Decimal::ONE);
        mid.add_child(leaf.id);
        let mid = save(&h, &mid).await;
        let mut root = BillOfMaterial::new("Root", Decimal::ONE);
        root.add_child(mid.id);
        let mut root = save(&h, &root).await;
        h.service.generate_tree(root.id).await.unwrap();
        assert_eq!(h.cache.len().await, 3);

        root.remove_child(mid.id);
        save(&h, &root).await;
        h.service.generate_tree(root.id).await.unwrap();
        assert_eq!(h.cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_new_version_numbers_past_lineage() {
        let h = harness(false);
        let original = save(&h, &BillOfMaterial::new("Frame", Decimal::ONE)).await;
        let v2 = h.service.generate_new_version(original.id).await.unwrap();
        assert_eq!(v2.version_number, 2);
        assert_eq!(v2.original_bom_id, Some(original.id));

        // Versioning the original again skips past v2
        let v3 = h.service.generate_new_version(original.id).await.unwrap();
        assert_eq!(v3.version_number, 3);
        let v4 = h.service.generate_new_version(v2.id).await.unwrap();
        assert_eq!(v4.version_number, 4);
        assert_eq!(h.service.resolve_latest_version(v3.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_customize() {
        let h = harness(false);
        let mut bom = BillOfMaterial::new("Frame", Decimal::ONE);
        bom.add_child(Uuid::new_v4());
        let bom = save(&h, &bom).await;

        let custom = h.service.customize(bom.id).await.unwrap();
        assert!(custom.personalized);
        assert_ne!(custom.id, bom.id);
        assert_eq!(custom.child_ids, bom.child_ids);
        assert_eq!(
            custom.name,
            format!("Frame (Personalized {})", &custom.id.simple().to_string()[..8])
        );
    }

    #[test]
    fn test_file_name() {
        let mut bom = BillOfMaterial::new("Frame", Decimal::ONE);
        assert_eq!(BillOfMaterialService::file_name(&bom), "Bill of Material-Frame");
        bom.version_number = 3;
        assert_eq!(BillOfMaterialService::file_name(&bom), "Bill of Material-Frame-V3");
    }

    #[tokio::test]
    async fn test_boms_for_product() {
        let h = harness(false);
        let product = Uuid::new_v4();
        let mut a = BillOfMaterial::new("A", Decimal::ONE);
        a.product_id = Some(product);
        save(&h, &a).await;
        save(&h, &BillOfMaterial::new("B", Decimal::ONE)).await;

        let found = h.service.boms_for_product(product).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }
}
