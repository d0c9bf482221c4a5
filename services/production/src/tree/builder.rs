//! Recursive materialization of a BOM structure into the tree cache.

use std::collections::HashSet;

use anyhow::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

use bomforge_database::{BillOfMaterialStore, TreeCacheStore};
use bomforge_models::{BillOfMaterial, TempBomTree};
use bomforge_utils::BomError;

use super::cycle_guard::CycleGuard;
use super::prune::{PruneEngine, PruneOutcome};
use super::BoxFuture;

/// Counters collected over one materialization pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PassStats {
    pub created: usize,
    pub updated: usize,
    /// Child edges not descended into because the child was already processed
    pub revisited: usize,
    pub deleted: usize,
    pub detached: usize,
}

impl PassStats {
    fn absorb(&mut self, outcome: &PruneOutcome) {
        self.deleted += outcome.deleted;
        self.detached += outcome.detached;
    }

    pub fn materialized(&self) -> usize {
        self.created + self.updated
    }
}

/// State of one pass, threaded through every recursive call.
#[derive(Debug, Default)]
pub struct MaterializationPass {
    pub guard: CycleGuard,
    pub stats: PassStats,
    /// Rows detached by pruning during this pass
    pub detached_rows: Vec<Uuid>,
}

impl MaterializationPass {
    fn absorb(&mut self, outcome: PruneOutcome) {
        self.stats.absorb(&outcome);
        self.detached_rows.extend(outcome.detached_ids);
    }
}

/// Result of generating the cache for a root BOM.
#[derive(Debug, Clone)]
pub struct TreeGeneration {
    pub root: TempBomTree,
    pub stats: PassStats,
}

pub struct TreeBuilder<'a> {
    boms: &'a dyn BillOfMaterialStore,
    cache: &'a dyn TreeCacheStore,
    prune: PruneEngine<'a>,
    sweep_orphans: bool,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(boms: &'a dyn BillOfMaterialStore, cache: &'a dyn TreeCacheStore) -> Self {
        Self {
            boms,
            cache,
            prune: PruneEngine::new(cache),
            sweep_orphans: false,
        }
    }

    /// Once the pass is done, delete the rows it detached that are still
    /// orphaned, along with everything below them. Orphans left by earlier
    /// passes are not touched.
    pub fn with_orphan_sweep(mut self, sweep_orphans: bool) -> Self {
        self.sweep_orphans = sweep_orphans;
        self
    }

    /// Materializes the cache for `root` with a fresh pass.
    pub async fn generate(&self, root: &BillOfMaterial) -> Result<TreeGeneration> {
        let mut pass = MaterializationPass::default();

        let root_node = self
            .materialize(root, None, None, &mut pass)
            .await
            .with_context(|| format!("Failed to generate tree for bill of material {}", root.id))?;

        if self.sweep_orphans {
            let swept = self.prune.sweep_orphans(&pass.detached_rows).await?;
            pass.stats.absorb(&swept);
        }

        info!(
            bom_id = %root.id,
            created = pass.stats.created,
            updated = pass.stats.updated,
            revisited = pass.stats.revisited,
            deleted = pass.stats.deleted,
            detached = pass.stats.detached,
            "Bom tree generated"
        );

        Ok(TreeGeneration {
            root: root_node,
            stats: pass.stats,
        })
    }

    /// Creates or refreshes the cache row for `bom` under `parent_bom`, then
    /// recurses into every child not yet processed in this pass and prunes
    /// the rows of children that are gone.
    pub fn materialize<'s>(
        &'s self,
        bom: &'s BillOfMaterial,
        parent_bom: Option<&'s BillOfMaterial>,
        parent_node: Option<&'s TempBomTree>,
        pass: &'s mut MaterializationPass,
    ) -> BoxFuture<'s, Result<TempBomTree>> {
        Box::pin(async move {
            let parent_bom_id = parent_bom.map(|p| p.id);

            let mut node = match self.cache.find_node(bom.id, parent_bom_id).await? {
                Some(existing) => {
                    pass.stats.updated += 1;
                    existing
                }
                None => {
                    pass.stats.created += 1;
                    TempBomTree::for_bom(bom, parent_bom_id)
                }
            };
            node.mirror(bom);
            node.parent_bom_id = parent_bom_id;
            node.parent_id = parent_node.map(|p| p.id);
            let node = self.cache.save(&node).await?;

            pass.guard.mark_processed(bom.id);

            let mut valid_child_ids: HashSet<Uuid> = HashSet::with_capacity(bom.child_ids.len());
            for &child_id in &bom.child_ids {
                if pass.guard.is_processed(child_id) {
                    debug!(bom_id = %child_id, "Already processed");
                    pass.stats.revisited += 1;
                } else {
                    let child = self
                        .boms
                        .find_by_id(child_id)
                        .await?
                        .ok_or_else(|| BomError::not_found(format!("Bill of material {}", child_id)))?;
                    self.materialize(&child, Some(bom), Some(&node), pass).await?;
                }
                valid_child_ids.insert(child_id);
            }

            let outcome = self.prune.reconcile_children(&valid_child_ids, bom.id).await?;
            pass.absorb(outcome);

            Ok(node)
        })
    }
}
