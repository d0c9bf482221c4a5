use std::collections::HashSet;

use uuid::Uuid;

/// Source BOMs already materialized in the current pass.
///
/// A BOM seen once is never descended into again during the same pass, which
/// keeps a cyclic product structure from recursing forever.
#[derive(Debug, Default, Clone)]
pub struct CycleGuard {
    processed: HashSet<Uuid>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `bom_id`, returning false if it was already recorded
    pub fn mark_processed(&mut self, bom_id: Uuid) -> bool {
        self.processed.insert(bom_id)
    }

    pub fn is_processed(&self, bom_id: Uuid) -> bool {
        self.processed.contains(&bom_id)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}
