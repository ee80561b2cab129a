//! Taxon storage
//!
//! The core reads and writes taxa only through [`TaxonStore`]: unique lookup
//! by identifier, property and label writes, typed edges, and transaction
//! boundaries around batches of writes.
//!
//! - [`MemoryStore`] - in-memory implementation with undo-log transactions
//!
//! # Example
//!
//! ```
//! use clb_common::{Label, RelType};
//! use clb_ingest::models::TaxonRecord;
//! use clb_ingest::store::{MemoryStore, TaxonStore};
//!
//! # fn main() -> clb_common::Result<()> {
//! let mut store = MemoryStore::new();
//! let animalia = store.insert(TaxonRecord::new("A").with_name("Animalia"))?;
//! let chordata = store.insert(TaxonRecord::new("B").with_name("Chordata"))?;
//!
//! store.begin();
//! store.create_edge(animalia, chordata, RelType::ParentOf)?;
//! store.add_label(animalia, Label::Root)?;
//! store.commit()?;
//!
//! assert_eq!(store.children_of(animalia), vec![chordata]);
//! assert_eq!(store.roots(), vec![animalia]);
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryStore;

use clb_common::{ClbError, Label, RelType, Result};

use crate::models::{NodeId, Property, Taxon, TaxonRecord};

/// Which end of an edge to follow from a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Edges where the node is the source
    Outgoing,
    /// Edges where the node is the target
    Incoming,
}

/// Storage capability consumed by the resolver, the path producer and the
/// start/end handlers.
pub trait TaxonStore {
    /// Add a taxon; identifiers must be unique
    fn insert(&mut self, record: TaxonRecord) -> Result<NodeId>;

    /// Unique lookup by taxon identifier
    fn find(&self, taxon_id: &str) -> Option<NodeId>;

    /// Lookup by exact scientific name
    fn find_by_name(&self, name: &str) -> Vec<NodeId>;

    fn taxon(&self, node: NodeId) -> Option<&Taxon>;

    /// All nodes in insertion order
    fn nodes(&self) -> Vec<NodeId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_label(&mut self, node: NodeId, label: Label) -> Result<()>;

    fn set_property(&mut self, node: NodeId, property: Property) -> Result<()>;

    fn create_edge(&mut self, from: NodeId, to: NodeId, rel: RelType) -> Result<()>;

    /// Nodes on the other end of `rel` edges in the given direction
    fn related(&self, node: NodeId, rel: RelType, direction: Direction) -> Vec<NodeId>;

    fn edge_count(&self, rel: RelType) -> usize;

    /// Drop every edge, ROOT/SYNONYM label and derived property; returns the number of edges removed
    fn clear_relations(&mut self) -> Result<usize>;

    /// Open a transaction; writes until `commit` or `rollback` form one batch
    fn begin(&mut self);

    fn commit(&mut self) -> Result<()>;

    /// Undo every write since the last `begin`
    fn rollback(&mut self);

    fn taxon_ref(&self, node: NodeId) -> Result<&Taxon> {
        self.taxon(node)
            .ok_or(ClbError::UnknownNode(node.as_u64()))
    }

    fn has_label(&self, node: NodeId, label: Label) -> bool {
        self.taxon(node).is_some_and(|t| t.has_label(label))
    }

    /// `PARENT_OF` targets of a node
    fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        self.related(node, RelType::ParentOf, Direction::Outgoing)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.related(node, RelType::ParentOf, Direction::Incoming)
            .first()
            .copied()
    }

    /// Sources of `SYNONYM_OF` edges pointing at a node
    fn synonyms_of(&self, node: NodeId) -> Vec<NodeId> {
        self.related(node, RelType::SynonymOf, Direction::Incoming)
    }

    fn accepted_of(&self, node: NodeId) -> Option<NodeId> {
        self.related(node, RelType::SynonymOf, Direction::Outgoing)
            .first()
            .copied()
    }

    fn roots(&self) -> Vec<NodeId> {
        self.nodes()
            .into_iter()
            .filter(|n| self.has_label(*n, Label::Root))
            .collect()
    }
}
