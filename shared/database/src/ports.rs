//! Repository ports.
//!
//! The tree and version algorithms talk to storage only through these two
//! traits. Every method is one atomic unit of work; callers never see a
//! partially written row.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use bomforge_models::{BillOfMaterial, TempBomTree};

/// Source bill of material storage
#[async_trait]
pub trait BillOfMaterialStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BillOfMaterial>>;

    async fn find_by_product(&self, product_id: Uuid) -> Result<Vec<BillOfMaterial>>;

    /// BOMs directly derived from `original_id`, highest version first.
    ///
    /// `excluding` drops one BOM from the result; `None` drops nothing.
    async fn find_descendant_versions(
        &self,
        original_id: Uuid,
        excluding: Option<Uuid>,
    ) -> Result<Vec<BillOfMaterial>>;

    /// Inserts or updates a BOM together with its child references
    async fn save(&self, bom: &BillOfMaterial) -> Result<BillOfMaterial>;
}

/// Tree cache storage
#[async_trait]
pub trait TreeCacheStore: Send + Sync {
    /// Exact match on `(bom, parent_bom)`. `parent_bom_id = None` matches
    /// only rows without a parent BOM.
    async fn find_node(&self, bom_id: Uuid, parent_bom_id: Option<Uuid>) -> Result<Option<TempBomTree>>;

    /// Rows under `parent_bom_id` whose BOM is set and not in `valid_child_ids`.
    ///
    /// Rows whose BOM is absent never match. An empty set is allowed.
    async fn find_stale_children(
        &self,
        parent_bom_id: Uuid,
        valid_child_ids: &HashSet<Uuid>,
    ) -> Result<Vec<TempBomTree>>;

    /// Rows whose parent row is one of `parent_ids`, oldest first
    async fn find_by_parents(&self, parent_ids: &[Uuid]) -> Result<Vec<TempBomTree>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<TempBomTree>>;

    async fn save(&self, node: &TempBomTree) -> Result<TempBomTree>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}
