use anyhow::Result;
use sqlx::PgPool;

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    // Create bill_of_materials table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bill_of_materials (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR NOT NULL,
            product_id UUID,
            qty NUMERIC NOT NULL DEFAULT 1,
            unit_id UUID,
            prod_process_id UUID,
            version_number INTEGER NOT NULL DEFAULT 1 CHECK (version_number >= 1),
            original_bom_id UUID REFERENCES bill_of_materials(id) ON DELETE SET NULL,
            personalized BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create bill_of_material_children table (the child BOM set)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bill_of_material_children (
            parent_id UUID NOT NULL REFERENCES bill_of_materials(id) ON DELETE CASCADE,
            child_id UUID NOT NULL REFERENCES bill_of_materials(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            PRIMARY KEY (parent_id, child_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create temp_bom_trees table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS temp_bom_trees (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            bom_id UUID REFERENCES bill_of_materials(id) ON DELETE SET NULL,
            parent_bom_id UUID REFERENCES bill_of_materials(id) ON DELETE CASCADE,
            parent_id UUID REFERENCES temp_bom_trees(id) ON DELETE SET NULL,
            product_id UUID,
            qty NUMERIC NOT NULL DEFAULT 0,
            unit_id UUID,
            prod_process_id UUID,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bill_of_materials_product_id ON bill_of_materials(product_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bill_of_materials_original ON bill_of_materials(original_bom_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_temp_bom_trees_bom ON temp_bom_trees(bom_id, parent_bom_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_temp_bom_trees_parent_bom ON temp_bom_trees(parent_bom_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_temp_bom_trees_parent ON temp_bom_trees(parent_id)")
        .execute(pool)
        .await?;

    tracing::info!("PostgreSQL migrations completed successfully");
    Ok(())
}
