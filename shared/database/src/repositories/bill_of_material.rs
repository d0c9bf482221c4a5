//! Bill of Material Repository
//!
//! Postgres storage for source BOMs and their child links.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use bomforge_models::BillOfMaterial;

use crate::ports::BillOfMaterialStore;

const SELECT_BOM: &str = r#"
    SELECT b.id, b.name, b.product_id, b.qty, b.unit_id, b.prod_process_id,
           ARRAY(
               SELECT c.child_id FROM bill_of_material_children c
               WHERE c.parent_id = b.id
               ORDER BY c.position
           ) AS child_ids,
           b.version_number, b.original_bom_id, b.personalized,
           b.created_at, b.updated_at
    FROM bill_of_materials b
"#;

pub struct BillOfMaterialRepository {
    pool: PgPool,
}

impl BillOfMaterialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillOfMaterialStore for BillOfMaterialRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BillOfMaterial>> {
        sqlx::query_as::<_, BillOfMaterial>(&format!("{} WHERE b.id = $1", SELECT_BOM))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch bill of material by ID")
    }

    async fn find_by_product(&self, product_id: Uuid) -> Result<Vec<BillOfMaterial>> {
        sqlx::query_as::<_, BillOfMaterial>(&format!(
            "{} WHERE b.product_id = $1 ORDER BY b.name, b.version_number",
            SELECT_BOM
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch bills of material by product")
    }

    async fn find_descendant_versions(
        &self,
        original_id: Uuid,
        excluding: Option<Uuid>,
    ) -> Result<Vec<BillOfMaterial>> {
        sqlx::query_as::<_, BillOfMaterial>(&format!(
            r#"{}
            WHERE b.original_bom_id = $1
              AND ($2::uuid IS NULL OR b.id <> $2)
            ORDER BY b.version_number DESC, b.id
            "#,
            SELECT_BOM
        ))
        .bind(original_id)
        .bind(excluding)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch descendant versions")
    }

    async fn save(&self, bom: &BillOfMaterial) -> Result<BillOfMaterial> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        sqlx::query(
            r#"
            INSERT INTO bill_of_materials
                (id, name, product_id, qty, unit_id, prod_process_id,
                 version_number, original_bom_id, personalized, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                product_id = EXCLUDED.product_id,
                qty = EXCLUDED.qty,
                unit_id = EXCLUDED.unit_id,
                prod_process_id = EXCLUDED.prod_process_id,
                version_number = EXCLUDED.version_number,
                original_bom_id = EXCLUDED.original_bom_id,
                personalized = EXCLUDED.personalized,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(bom.id)
        .bind(&bom.name)
        .bind(bom.product_id)
        .bind(bom.qty)
        .bind(bom.unit_id)
        .bind(bom.prod_process_id)
        .bind(bom.version_number)
        .bind(bom.original_bom_id)
        .bind(bom.personalized)
        .bind(bom.created_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .context("Failed to save bill of material")?;

        sqlx::query("DELETE FROM bill_of_material_children WHERE parent_id = $1")
            .bind(bom.id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear child links")?;

        sqlx::query(
            r#"
            INSERT INTO bill_of_material_children (parent_id, child_id, position)
            SELECT $1, t.child_id, (t.ord - 1)::INTEGER
            FROM UNNEST($2::uuid[]) WITH ORDINALITY AS t(child_id, ord)
            "#,
        )
        .bind(bom.id)
        .bind(&bom.child_ids)
        .execute(&mut *tx)
        .await
        .context("Failed to save child links")?;

        let saved = sqlx::query_as::<_, BillOfMaterial>(&format!("{} WHERE b.id = $1", SELECT_BOM))
            .bind(bom.id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to reload bill of material")?;

        tx.commit().await.context("Failed to commit bill of material")?;

        Ok(saved)
    }
}
