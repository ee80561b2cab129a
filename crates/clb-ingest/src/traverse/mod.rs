//! Depth-first traversal of the classification forest
//!
//! - [`TaxonomicOrder`] - deterministic sibling order
//! - [`TaxonomicPaths`] - lazy pre-order root-to-node paths over a store
//! - [`TaxonWalker`] - turns consecutive paths into start/end events

pub mod order;
pub mod paths;
pub mod walker;

pub use order::TaxonomicOrder;
pub use paths::{FixedPaths, Path, PathSource, TaxonomicPaths};
pub use walker::{StartEndHandler, TaxonWalker, WalkStats};
