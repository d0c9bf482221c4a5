//! BOM tree cache materialization
//!
//! Walks a product structure depth first and mirrors it into
//! `TempBomTree` rows, one per `(bom, parent bom)` edge reached.
//!
//! - [`CycleGuard`] stops the walk from descending into a BOM twice in a pass
//! - [`TreeBuilder`] creates or refreshes rows and recurses into children
//! - [`PruneEngine`] removes rows of children that no longer exist
//!
//! A BOM reached a second time keeps whatever subtree it already has in the
//! cache. In a structure where the same BOM appears under several parents
//! only the first edge walked gets a row in a given pass.

use std::future::Future;
use std::pin::Pin;

pub mod builder;
pub mod cycle_guard;
pub mod prune;

pub use builder::{MaterializationPass, PassStats, TreeBuilder, TreeGeneration};
pub use cycle_guard::CycleGuard;
pub use prune::{PruneEngine, PruneOutcome};

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
