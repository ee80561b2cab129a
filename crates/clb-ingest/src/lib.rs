//! Checklist Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Builds a taxonomic forest from flat, foreign-key linked checklist records
//! and indexes it as a nested set.
//!
//! # Phases
//!
//! - **Load**: [`archive::CoreFileReader`] or any record iterator feeds a
//!   [`store::TaxonStore`]
//! - **Resolve**: [`resolver::ReferenceResolver`] turns parent, accepted and
//!   basionym references into typed edges and ROOT/SYNONYM labels
//! - **Index**: [`traverse::TaxonWalker`] derives start/end events from
//!   depth-first paths; [`nested_set::NestedSetHandler`] assigns `lft`/`rgt`
//!   and [`metrics::UsageMetricsHandler`] rolls up counts and classification
//!
//! # Example
//!
//! ```
//! use clb_ingest::importer::ChecklistImporter;
//! use clb_ingest::models::TaxonRecord;
//! use clb_ingest::store::{MemoryStore, TaxonStore};
//!
//! # fn main() -> clb_common::Result<()> {
//! let records = vec![
//!     Ok(TaxonRecord::new("A").with_name("Animalia").with_rank("kingdom")),
//!     Ok(TaxonRecord::new("B").with_name("Chordata").with_parent("A")),
//!     Ok(TaxonRecord::new("C").with_name("Zoa").with_accepted("A")),
//! ];
//!
//! let mut store = MemoryStore::new();
//! let report = ChecklistImporter::default().import(&mut store, records)?;
//!
//! let animalia = store.taxon_ref(store.find("A").unwrap())?;
//! assert_eq!(animalia.interval(), Some((0, 3)));
//! assert_eq!(report.synonyms, 1);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod importer;
pub mod metrics;
pub mod models;
pub mod nested_set;
pub mod resolver;
pub mod store;
pub mod traverse;

pub use config::ImportConfig;
pub use importer::{ChecklistImporter, ImportReport};
pub use models::{NodeId, TaxonRecord};
pub use store::{MemoryStore, TaxonStore};
