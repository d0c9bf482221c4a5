//! Version lineage resolution.
//!
//! Every new version of a BOM points back at the BOM it was copied from.
//! The highest version of a lineage can sit on any branch, so resolution
//! climbs the ancestor chain and searches each ancestor's other descendants.

use std::collections::HashSet;

use anyhow::Result;
use tracing::warn;
use uuid::Uuid;

use bomforge_database::BillOfMaterialStore;
use bomforge_models::BillOfMaterial;

use crate::tree::BoxFuture;

pub struct VersionResolver<'a> {
    boms: &'a dyn BillOfMaterialStore,
}

impl<'a> VersionResolver<'a> {
    pub fn new(boms: &'a dyn BillOfMaterialStore) -> Self {
        Self { boms }
    }

    /// Highest version number in the lineage connected to `bom`.
    pub async fn resolve_latest_version(&self, bom: &BillOfMaterial) -> Result<i32> {
        let mut visited = HashSet::new();
        self.latest_version(bom, bom.version_number, true, &mut visited)
            .await
    }

    /// Folds the versions derived from `bom` into `current_max`.
    ///
    /// With `deep` set, repeats the search from each ancestor in turn,
    /// skipping the branch it just came from. BOMs already in `visited` are
    /// not searched again, so a cyclic lineage stops instead of looping.
    pub fn latest_version<'s>(
        &'s self,
        bom: &'s BillOfMaterial,
        current_max: i32,
        deep: bool,
        visited: &'s mut HashSet<Uuid>,
    ) -> BoxFuture<'s, Result<i32>> {
        Box::pin(async move {
            let mut latest = current_max;
            let mut up = bom.clone();
            let mut previous: Option<Uuid> = None;

            loop {
                if !visited.insert(up.id) {
                    warn!(bom_id = %up.id, "Version lineage cycle detected");
                    break;
                }

                let descendants = self.boms.find_descendant_versions(up.id, previous).await?;
                if let Some(highest) = descendants.first() {
                    latest = latest.max(highest.version_number);
                    for descendant in &descendants {
                        let found = self.latest_version(descendant, latest, false, visited).await?;
                        latest = latest.max(found);
                    }
                }

                if !deep {
                    break;
                }

                let Some(original_id) = up.original_bom_id else {
                    break;
                };
                match self.boms.find_by_id(original_id).await? {
                    Some(original) => {
                        previous = Some(up.id);
                        up = original;
                    }
                    None => {
                        warn!(bom_id = %up.id, original_bom_id = %original_id, "Original bill of material not found");
                        break;
                    }
                }
            }

            Ok(latest)
        })
    }
}
