//! Tree cache models.
//!
//! A [`TempBomTree`] row is a denormalized copy of one BOM in the context of
//! one parent BOM. Rows are linked to the row of their parent, so the cache
//! for a root BOM can be read back as a plain tree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::BillOfMaterial;

/// One cached BOM-in-context.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TempBomTree {
    pub id: Uuid,
    /// Mirrored source BOM. Absent once the source row is gone.
    pub bom_id: Option<Uuid>,
    /// Source parent BOM, absent for a root.
    pub parent_bom_id: Option<Uuid>,
    /// Cache row of the parent, absent for a root or a detached row.
    pub parent_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub qty: Decimal,
    pub unit_id: Option<Uuid>,
    pub prod_process_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for TempBomTree {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            bom_id: None,
            parent_bom_id: None,
            parent_id: None,
            product_id: None,
            qty: Decimal::ZERO,
            unit_id: None,
            prod_process_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl TempBomTree {
    /// Creates an empty cache row for `bom` under `parent_bom_id`
    pub fn for_bom(bom: &BillOfMaterial, parent_bom_id: Option<Uuid>) -> Self {
        let mut node = Self {
            parent_bom_id,
            ..Self::default()
        };
        node.mirror(bom);
        node
    }

    /// Overwrites the mirrored attributes with the current values of `bom`.
    pub fn mirror(&mut self, bom: &BillOfMaterial) {
        self.bom_id = Some(bom.id);
        self.prod_process_id = bom.prod_process_id;
        self.product_id = bom.product_id;
        self.qty = bom.qty;
        self.unit_id = bom.unit_id;
        self.updated_at = Utc::now();
    }

    pub fn is_root(&self) -> bool {
        self.parent_bom_id.is_none()
    }

    /// A non-root row that lost its parent row during pruning.
    pub fn is_orphan(&self) -> bool {
        self.parent_bom_id.is_some() && self.parent_id.is_none()
    }

    /// Whether the mirrored attributes match `bom`
    pub fn mirrors(&self, bom: &BillOfMaterial) -> bool {
        self.bom_id == Some(bom.id)
            && self.product_id == bom.product_id
            && self.qty == bom.qty
            && self.unit_id == bom.unit_id
            && self.prod_process_id == bom.prod_process_id
    }
}

/// Nested read model of a cached tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomTreeView {
    #[serde(flatten)]
    pub node: TempBomTree,
    pub children: Vec<BomTreeView>,
}

impl BomTreeView {
    pub fn leaf(node: TempBomTree) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Number of rows in this subtree, including its root
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(BomTreeView::node_count).sum::<usize>()
    }

    /// Longest root-to-leaf path, counted in rows
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(BomTreeView::depth).max().unwrap_or(0)
    }

    /// Finds the first row in this subtree mirroring `bom_id`
    pub fn find(&self, bom_id: Uuid) -> Option<&BomTreeView> {
        if self.node.bom_id == Some(bom_id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(bom_id))
    }
}
