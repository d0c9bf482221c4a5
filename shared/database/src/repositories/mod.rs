//! Repository module for database CRUD operations
//!
//! Postgres implementations of the repository ports.

pub mod bill_of_material;
pub mod bom_tree;

pub use bill_of_material::BillOfMaterialRepository;
pub use bom_tree::TempBomTreeRepository;
