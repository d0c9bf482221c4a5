//! Stale cache row removal.

use std::collections::HashSet;
use std::ops::AddAssign;

use anyhow::Result;
use tracing::debug;
use uuid::Uuid;

use bomforge_database::TreeCacheStore;
use bomforge_models::TempBomTree;

/// Rows removed and rows detached by a reconciliation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneOutcome {
    pub deleted: usize,
    pub detached: usize,
    /// Rows left without a parent row
    pub detached_ids: Vec<Uuid>,
}

impl AddAssign for PruneOutcome {
    fn add_assign(&mut self, other: Self) {
        self.deleted += other.deleted;
        self.detached += other.detached;
        self.detached_ids.extend(other.detached_ids);
    }
}

pub struct PruneEngine<'a> {
    cache: &'a dyn TreeCacheStore,
}

impl<'a> PruneEngine<'a> {
    pub fn new(cache: &'a dyn TreeCacheStore) -> Self {
        Self { cache }
    }

    /// Deletes the cache rows under `parent_bom_id` whose BOM is no longer a
    /// child of it.
    ///
    /// Rows hanging below a deleted row are detached rather than deleted, so
    /// they survive as orphans. Must run after every child of the parent has
    /// been materialized in the current pass.
    pub async fn reconcile_children(
        &self,
        valid_child_ids: &HashSet<Uuid>,
        parent_bom_id: Uuid,
    ) -> Result<PruneOutcome> {
        let stale = self
            .cache
            .find_stale_children(parent_bom_id, valid_child_ids)
            .await?;

        if stale.is_empty() {
            return Ok(PruneOutcome::default());
        }

        debug!(
            parent_bom_id = %parent_bom_id,
            stale = ?stale.iter().map(|n| n.id).collect::<Vec<_>>(),
            "Invalid bom trees"
        );

        self.remove(&stale).await
    }

    /// Deletes the rows among `candidates` that are still orphaned, then the
    /// rows that deleting them leaves orphaned, until none are left.
    ///
    /// Orphans outside `candidates` and their subtrees are left alone.
    pub async fn sweep_orphans(&self, candidates: &[Uuid]) -> Result<PruneOutcome> {
        let mut outcome = PruneOutcome::default();
        let mut frontier = candidates.to_vec();

        while !frontier.is_empty() {
            let orphans: Vec<TempBomTree> = self
                .cache
                .find_by_ids(&frontier)
                .await?
                .into_iter()
                .filter(TempBomTree::is_orphan)
                .collect();
            if orphans.is_empty() {
                break;
            }
            debug!(count = orphans.len(), "Sweeping orphaned bom trees");
            let removed = self.remove(&orphans).await?;
            frontier = removed.detached_ids.clone();
            outcome += removed;
        }

        Ok(outcome)
    }

    async fn remove(&self, nodes: &[TempBomTree]) -> Result<PruneOutcome> {
        let mut outcome = PruneOutcome::default();
        let ids: Vec<Uuid> = nodes.iter().map(|n| n.id).collect();

        for mut child in self.cache.find_by_parents(&ids).await? {
            child.parent_id = None;
            self.cache.save(&child).await?;
            outcome.detached += 1;
            outcome.detached_ids.push(child.id);
        }

        for id in ids {
            if self.cache.delete(id).await? {
                outcome.deleted += 1;
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomforge_database::InMemoryTreeCache;
    use bomforge_models::BillOfMaterial;
    use rust_decimal::Decimal;

    async fn row(
        cache: &InMemoryTreeCache,
        bom: &BillOfMaterial,
        parent_bom: Option<&BillOfMaterial>,
        parent: Option<&TempBomTree>,
    ) -> TempBomTree {
        let mut node = TempBomTree::for_bom(bom, parent_bom.map(|p| p.id));
        node.parent_id = parent.map(|p| p.id);
        cache.save(&node).await.unwrap()
    }

    #[tokio::test]
    async fn test_reconcile_detaches_grandchildren() {
        let cache = InMemoryTreeCache::new();
        let root = BillOfMaterial::new("Root", Decimal::ONE);
        let kept = BillOfMaterial::new("Kept", Decimal::ONE);
        let removed = BillOfMaterial::new("Removed", Decimal::ONE);
        let below = BillOfMaterial::new("Below", Decimal::ONE);

        let root_row = row(&cache, &root, None, None).await;
        let kept_row = row(&cache, &kept, Some(&root), Some(&root_row)).await;
        let removed_row = row(&cache, &removed, Some(&root), Some(&root_row)).await;
        let below_row = row(&cache, &below, Some(&removed), Some(&removed_row)).await;

        let engine = PruneEngine::new(&cache);
        let valid: HashSet<Uuid> = [kept.id].into_iter().collect();
        let outcome = engine.reconcile_children(&valid, root.id).await.unwrap();

        assert_eq!(
            outcome,
            PruneOutcome {
                deleted: 1,
                detached: 1,
                detached_ids: vec![below_row.id],
            }
        );
        assert!(cache.get(removed_row.id).await.is_none());
        assert!(cache.get(kept_row.id).await.is_some());
        let below_row = cache.get(below_row.id).await.unwrap();
        assert!(below_row.is_orphan());
    }

    #[tokio::test]
    async fn test_reconcile_without_stale_rows_is_noop() {
        let cache = InMemoryTreeCache::new();
        let root = BillOfMaterial::new("Root", Decimal::ONE);
        let child = BillOfMaterial::new("Child", Decimal::ONE);
        let root_row = row(&cache, &root, None, None).await;
        row(&cache, &child, Some(&root), Some(&root_row)).await;

        let valid: HashSet<Uuid> = [child.id].into_iter().collect();
        let outcome = PruneEngine::new(&cache)
            .reconcile_children(&valid, root.id)
            .await
            .unwrap();

        assert_eq!(outcome, PruneOutcome::default());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_sweep_removes_orphaned_subtrees() {
        let cache = InMemoryTreeCache::new();
        let root = BillOfMaterial::new("Root", Decimal::ONE);
        let a = BillOfMaterial::new("A", Decimal::ONE);
        let b = BillOfMaterial::new("B", Decimal::ONE);

        let other = BillOfMaterial::new("Other", Decimal::ONE);

        let root_row = row(&cache, &root, None, None).await;
        let orphan = row(&cache, &a, Some(&root), None).await;
        row(&cache, &b, Some(&a), Some(&orphan)).await;
        let unrelated = row(&cache, &other, Some(&root), None).await;

        let outcome = PruneEngine::new(&cache)
            .sweep_orphans(&[orphan.id, root_row.id])
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 2);
        assert_eq!(cache.len().await, 2);
        assert!(cache.get(root_row.id).await.is_some());
        // Orphans that were not candidates survive the sweep
        assert!(cache.get(unrelated.id).await.is_some());
    }
}
