//! # Bomforge Core Domain Models
//!
//! Domain models shared by the Bomforge production services.
//!
//! ## Key Models
//!
//! - **BillOfMaterial**: a source product-structure node with child references
//!   and a version lineage
//! - **TempBomTree**: a cached, denormalized copy of one BOM under one parent
//! - **BomTreeView**: the nested read model of a cached tree

pub mod bill_of_material;
pub mod bom_tree;

pub use bill_of_material::*;
pub use bom_tree::*;
