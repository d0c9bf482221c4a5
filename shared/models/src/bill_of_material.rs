//! Bill of material domain model.
//!
//! A bill of material (BOM) describes the components needed to build a
//! product. BOMs reference child BOMs, forming a product structure, and
//! reference the BOM they were versioned from, forming a lineage.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A node of the source product structure.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate, PartialEq)]
pub struct BillOfMaterial {
    pub id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub product_id: Option<Uuid>,
    #[validate(custom = "validate_qty")]
    pub qty: Decimal,
    pub unit_id: Option<Uuid>,
    pub prod_process_id: Option<Uuid>,
    /// Ordered child BOM references. The structure is expected to be acyclic
    /// but nothing enforces it.
    pub child_ids: Vec<Uuid>,
    #[validate(range(min = 1, message = "Version number must be at least 1"))]
    pub version_number: i32,
    /// The BOM this one was versioned from.
    pub original_bom_id: Option<Uuid>,
    pub personalized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for BillOfMaterial {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            product_id: None,
            qty: Decimal::ONE,
            unit_id: None,
            prod_process_id: None,
            child_ids: Vec::new(),
            version_number: 1,
            original_bom_id: None,
            personalized: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

fn validate_qty(qty: &Decimal) -> Result<(), ValidationError> {
    if qty.is_sign_negative() || qty.is_zero() {
        return Err(ValidationError::new("qty_must_be_positive"));
    }
    Ok(())
}

impl BillOfMaterial {
    /// Creates a first-version BOM with the given name and quantity
    pub fn new(name: impl Into<String>, qty: Decimal) -> Self {
        Self {
            name: name.into(),
            qty,
            ..Self::default()
        }
    }

    /// Adds a child reference unless it is already present
    pub fn add_child(&mut self, child_id: Uuid) {
        if !self.child_ids.contains(&child_id) {
            self.child_ids.push(child_id);
            self.updated_at = Utc::now();
        }
    }

    /// Removes a child reference
    pub fn remove_child(&mut self, child_id: Uuid) {
        if let Some(pos) = self.child_ids.iter().position(|id| *id == child_id) {
            self.child_ids.remove(pos);
            self.updated_at = Utc::now();
        }
    }

    pub fn has_children(&self) -> bool {
        !self.child_ids.is_empty()
    }

    /// Whether this BOM was derived from another one
    pub fn is_derived(&self) -> bool {
        self.original_bom_id.is_some()
    }

    /// Copies this BOM under a fresh identity. Child references are shared
    /// with the source, not duplicated.
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Builds the next version of this BOM in its lineage.
    pub fn derive_version(&self, version_number: i32) -> Self {
        Self {
            original_bom_id: Some(self.id),
            version_number,
            personalized: false,
            ..self.duplicate()
        }
    }
}
