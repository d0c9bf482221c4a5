//! In-memory stores.
//!
//! HashMap-backed implementations of the repository ports, used by the unit
//! tests and by the `memory` storage backend for local runs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use bomforge_models::{BillOfMaterial, TempBomTree};

use crate::ports::{BillOfMaterialStore, TreeCacheStore};

#[derive(Clone, Default)]
pub struct InMemoryBomStore {
    boms: Arc<RwLock<HashMap<Uuid, BillOfMaterial>>>,
}

impl InMemoryBomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.boms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.boms.read().await.is_empty()
    }
}

#[async_trait]
impl BillOfMaterialStore for InMemoryBomStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BillOfMaterial>> {
        Ok(self.boms.read().await.get(&id).cloned())
    }

    async fn find_by_product(&self, product_id: Uuid) -> Result<Vec<BillOfMaterial>> {
        let mut boms: Vec<BillOfMaterial> = self
            .boms
            .read()
            .await
            .values()
            .filter(|b| b.product_id == Some(product_id))
            .cloned()
            .collect();
        boms.sort_by(|a, b| a.name.cmp(&b.name).then(a.version_number.cmp(&b.version_number)));
        Ok(boms)
    }

    async fn find_descendant_versions(
        &self,
        original_id: Uuid,
        excluding: Option<Uuid>,
    ) -> Result<Vec<BillOfMaterial>> {
        let mut boms: Vec<BillOfMaterial> = self
            .boms
            .read()
            .await
            .values()
            .filter(|b| b.original_bom_id == Some(original_id) && Some(b.id) != excluding)
            .cloned()
            .collect();
        boms.sort_by(|a, b| b.version_number.cmp(&a.version_number).then(a.id.cmp(&b.id)));
        Ok(boms)
    }

    async fn save(&self, bom: &BillOfMaterial) -> Result<BillOfMaterial> {
        let mut saved = bom.clone();
        saved.updated_at = Utc::now();
        self.boms.write().await.insert(saved.id, saved.clone());
        Ok(saved)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTreeCache {
    nodes: Arc<RwLock<HashMap<Uuid, TempBomTree>>>,
}

impl InMemoryTreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every cached row
    pub async fn nodes(&self) -> Vec<TempBomTree> {
        self.nodes.read().await.values().cloned().collect()
    }

    pub async fn get(&self, id: Uuid) -> Option<TempBomTree> {
        self.nodes.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}

#[async_trait]
impl TreeCacheStore for InMemoryTreeCache {
    async fn find_node(&self, bom_id: Uuid, parent_bom_id: Option<Uuid>) -> Result<Option<TempBomTree>> {
        Ok(self
            .nodes
            .read()
            .await
            .values()
            .find(|n| n.bom_id == Some(bom_id) && n.parent_bom_id == parent_bom_id)
            .cloned())
    }

    async fn find_stale_children(
        &self,
        parent_bom_id: Uuid,
        valid_child_ids: &HashSet<Uuid>,
    ) -> Result<Vec<TempBomTree>> {
        Ok(self
            .nodes
            .read()
            .await
            .values()
            .filter(|n| n.parent_bom_id == Some(parent_bom_id))
            .filter(|n| n.bom_id.map_or(false, |id| !valid_child_ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn find_by_parents(&self, parent_ids: &[Uuid]) -> Result<Vec<TempBomTree>> {
        let mut children: Vec<TempBomTree> = self
            .nodes
            .read()
            .await
            .values()
            .filter(|n| n.parent_id.map_or(false, |p| parent_ids.contains(&p)))
            .cloned()
            .collect();
        children.sort_by_key(|n| n.created_at);
        Ok(children)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<TempBomTree>> {
        let nodes = self.nodes.read().await;
        Ok(ids.iter().filter_map(|id| nodes.get(id).cloned()).collect())
    }

    async fn save(&self, node: &TempBomTree) -> Result<TempBomTree> {
        let mut saved = node.clone();
        saved.updated_at = Utc::now();
        self.nodes.write().await.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.nodes.write().await.remove(&id).is_some())
    }
}
