//! Tree Cache Repository
//!
//! Postgres storage for materialized `TempBomTree` rows.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use bomforge_models::TempBomTree;

use crate::ports::TreeCacheStore;

const TREE_COLUMNS: &str = "id, bom_id, parent_bom_id, parent_id, product_id, qty, unit_id, \
                            prod_process_id, created_at, updated_at";

pub struct TempBomTreeRepository {
    pool: PgPool,
}

impl TempBomTreeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TreeCacheStore for TempBomTreeRepository {
    async fn find_node(&self, bom_id: Uuid, parent_bom_id: Option<Uuid>) -> Result<Option<TempBomTree>> {
        sqlx::query_as::<_, TempBomTree>(&format!(
            r#"
            SELECT {}
            FROM temp_bom_trees
            WHERE bom_id = $1 AND parent_bom_id IS NOT DISTINCT FROM $2
            ORDER BY created_at
            LIMIT 1
            "#,
            TREE_COLUMNS
        ))
        .bind(bom_id)
        .bind(parent_bom_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch tree cache row")
    }

    async fn find_stale_children(
        &self,
        parent_bom_id: Uuid,
        valid_child_ids: &HashSet<Uuid>,
    ) -> Result<Vec<TempBomTree>> {
        let valid: Vec<Uuid> = valid_child_ids.iter().copied().collect();

        sqlx::query_as::<_, TempBomTree>(&format!(
            r#"
            SELECT {}
            FROM temp_bom_trees
            WHERE parent_bom_id = $1
              AND bom_id IS NOT NULL
              AND NOT (bom_id = ANY($2))
            "#,
            TREE_COLUMNS
        ))
        .bind(parent_bom_id)
        .bind(&valid)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch stale tree cache rows")
    }

    async fn find_by_parents(&self, parent_ids: &[Uuid]) -> Result<Vec<TempBomTree>> {
        sqlx::query_as::<_, TempBomTree>(&format!(
            "SELECT {} FROM temp_bom_trees WHERE parent_id = ANY($1) ORDER BY created_at",
            TREE_COLUMNS
        ))
        .bind(parent_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch tree cache rows by parent")
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<TempBomTree>> {
        sqlx::query_as::<_, TempBomTree>(&format!(
            "SELECT {} FROM temp_bom_trees WHERE id = ANY($1)",
            TREE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch tree cache rows by ID")
    }

    async fn save(&self, node: &TempBomTree) -> Result<TempBomTree> {
        sqlx::query_as::<_, TempBomTree>(&format!(
            r#"
            INSERT INTO temp_bom_trees ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                bom_id = EXCLUDED.bom_id,
                parent_bom_id = EXCLUDED.parent_bom_id,
                parent_id = EXCLUDED.parent_id,
                product_id = EXCLUDED.product_id,
                qty = EXCLUDED.qty,
                unit_id = EXCLUDED.unit_id,
                prod_process_id = EXCLUDED.prod_process_id,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            TREE_COLUMNS, TREE_COLUMNS
        ))
        .bind(node.id)
        .bind(node.bom_id)
        .bind(node.parent_bom_id)
        .bind(node.parent_id)
        .bind(node.product_id)
        .bind(node.qty)
        .bind(node.unit_id)
        .bind(node.prod_process_id)
        .bind(node.created_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to save tree cache row")
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM temp_bom_trees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete tree cache row")?;

        Ok(result.rows_affected() > 0)
    }
}
