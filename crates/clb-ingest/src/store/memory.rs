//! In-memory taxon store

use std::collections::HashMap;

use clb_common::{ClbError, Label, RelType, Result};
use tracing::{debug, trace};

use super::{Direction, TaxonStore};
use crate::models::{NodeId, Property, Taxon, TaxonRecord, UsageMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    from: NodeId,
    to: NodeId,
    rel: RelType,
}

/// Derived state of one taxon, captured before `clear_relations`
#[derive(Debug, Clone)]
struct DerivedState {
    labels: std::collections::BTreeSet<Label>,
    lft: Option<u64>,
    rgt: Option<u64>,
    metrics: Option<UsageMetrics>,
}

/// Inverse of a single write, replayed on rollback
#[derive(Debug)]
enum Undo {
    Insert(NodeId),
    Label(NodeId, Label),
    Edge,
    Lft(NodeId, Option<u64>),
    Rgt(NodeId, Option<u64>),
    Metrics(NodeId, Option<UsageMetrics>),
    Term(NodeId, String, Option<String>),
    ClearRelations {
        edges: Vec<Edge>,
        derived: Vec<DerivedState>,
    },
}

/// Taxon store held entirely in memory.
///
/// Writes apply immediately. While a transaction is open every write also
/// records its inverse, so `rollback` restores the state at `begin`.
/// Writes outside a transaction are committed on the spot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    taxa: Vec<Taxon>,
    by_id: HashMap<String, NodeId>,
    by_name: HashMap<String, Vec<NodeId>>,
    edges: Vec<Edge>,
    outgoing: HashMap<NodeId, Vec<usize>>,
    incoming: HashMap<NodeId, Vec<usize>>,
    undo: Option<Vec<Undo>>,
    commits: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful commits so far
    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn in_transaction(&self) -> bool {
        self.undo.is_some()
    }

    /// Iterate over all taxa in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Taxon> {
        self.taxa.iter()
    }

    fn record(&mut self, undo: Undo) {
        if let Some(log) = self.undo.as_mut() {
            log.push(undo);
        }
    }

    fn taxon_mut(&mut self, node: NodeId) -> Result<&mut Taxon> {
        self.taxa
            .get_mut(node.index())
            .ok_or(ClbError::UnknownNode(node.as_u64()))
    }

    fn edges_at(&self, node: NodeId, direction: Direction) -> impl Iterator<Item = &Edge> {
        let index = match direction {
            Direction::Outgoing => &self.outgoing,
            Direction::Incoming => &self.incoming,
        };
        index
            .get(&node)
            .into_iter()
            .flatten()
            .map(move |idx| &self.edges[*idx])
    }

    fn has_edge(&self, node: NodeId, rel: RelType, direction: Direction) -> bool {
        self.edges_at(node, direction).any(|e| e.rel == rel)
    }

    fn rebuild_adjacency(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
        for (idx, edge) in self.edges.iter().enumerate() {
            self.outgoing.entry(edge.from).or_default().push(idx);
            self.incoming.entry(edge.to).or_default().push(idx);
        }
    }

    fn pop_edge(&mut self) {
        if let Some(edge) = self.edges.pop() {
            if let Some(out) = self.outgoing.get_mut(&edge.from) {
                out.pop();
            }
            if let Some(inc) = self.incoming.get_mut(&edge.to) {
                inc.pop();
            }
        }
    }

    fn pop_taxon(&mut self) {
        if let Some(taxon) = self.taxa.pop() {
            self.by_id.remove(&taxon.taxon_id);
            if let Some(name) = &taxon.scientific_name {
                if let Some(nodes) = self.by_name.get_mut(name) {
                    nodes.retain(|n| *n != taxon.node);
                }
            }
        }
    }

    fn apply_undo(&mut self, undo: Undo) {
        match undo {
            Undo::Insert(_) => self.pop_taxon(),
            Undo::Edge => self.pop_edge(),
            Undo::Label(node, label) => {
                if let Some(t) = self.taxa.get_mut(node.index()) {
                    t.labels.remove(&label);
                }
            },
            Undo::Lft(node, prev) => {
                if let Some(t) = self.taxa.get_mut(node.index()) {
                    t.lft = prev;
                }
            },
            Undo::Rgt(node, prev) => {
                if let Some(t) = self.taxa.get_mut(node.index()) {
                    t.rgt = prev;
                }
            },
            Undo::Metrics(node, prev) => {
                if let Some(t) = self.taxa.get_mut(node.index()) {
                    t.metrics = prev;
                }
            },
            Undo::Term(node, term, prev) => {
                if let Some(t) = self.taxa.get_mut(node.index()) {
                    match prev {
                        Some(value) => t.properties.insert(term, value),
                        None => t.properties.remove(&term),
                    };
                }
            },
            Undo::ClearRelations { edges, derived } => {
                self.edges = edges;
                self.rebuild_adjacency();
                for (taxon, state) in self.taxa.iter_mut().zip(derived) {
                    taxon.labels = state.labels;
                    taxon.lft = state.lft;
                    taxon.rgt = state.rgt;
                    taxon.metrics = state.metrics;
                }
            },
        }
    }
}

impl TaxonStore for MemoryStore {
    fn insert(&mut self, record: TaxonRecord) -> Result<NodeId> {
        if self.by_id.contains_key(&record.taxon_id) {
            return Err(ClbError::DuplicateIdentifier(record.taxon_id));
        }

        let node = NodeId::new(self.taxa.len() as u64);
        self.by_id.insert(record.taxon_id.clone(), node);
        if let Some(name) = &record.scientific_name {
            self.by_name.entry(name.clone()).or_default().push(node);
        }
        self.taxa.push(Taxon::from_record(node, record));
        self.record(Undo::Insert(node));
        Ok(node)
    }

    fn find(&self, taxon_id: &str) -> Option<NodeId> {
        self.by_id.get(taxon_id).copied()
    }

    fn find_by_name(&self, name: &str) -> Vec<NodeId> {
        self.by_name.get(name).cloned().unwrap_or_default()
    }

    fn taxon(&self, node: NodeId) -> Option<&Taxon> {
        self.taxa.get(node.index())
    }

    fn nodes(&self) -> Vec<NodeId> {
        self.taxa.iter().map(|t| t.node).collect()
    }

    fn len(&self) -> usize {
        self.taxa.len()
    }

    fn add_label(&mut self, node: NodeId, label: Label) -> Result<()> {
        if self.taxon_mut(node)?.labels.insert(label) {
            self.record(Undo::Label(node, label));
        }
        Ok(())
    }

    fn set_property(&mut self, node: NodeId, property: Property) -> Result<()> {
        let taxon = self.taxon_mut(node)?;
        let undo = match property {
            Property::Lft(value) => Undo::Lft(node, taxon.lft.replace(value)),
            Property::Rgt(value) => Undo::Rgt(node, taxon.rgt.replace(value)),
            Property::Metrics(metrics) => Undo::Metrics(node, taxon.metrics.replace(metrics)),
            Property::Term { term, value } => {
                let prev = taxon.properties.insert(term.clone(), value);
                Undo::Term(node, term, prev)
            },
        };
        self.record(undo);
        Ok(())
    }

    fn create_edge(&mut self, from: NodeId, to: NodeId, rel: RelType) -> Result<()> {
        self.taxon_ref(from)?;
        self.taxon_ref(to)?;

        if from == to {
            return Err(ClbError::SelfReference {
                node: from.as_u64(),
                relation: rel.to_string(),
            });
        }

        // a taxon has one parent, one accepted name and one basionym
        let (owner, direction) = match rel {
            RelType::ParentOf | RelType::BasionymOf => (to, Direction::Incoming),
            RelType::SynonymOf => (from, Direction::Outgoing),
        };
        if self.has_edge(owner, rel, direction) {
            return Err(ClbError::DuplicateRelation {
                node: owner.as_u64(),
                relation: rel.to_string(),
            });
        }

        let idx = self.edges.len();
        self.edges.push(Edge { from, to, rel });
        self.outgoing.entry(from).or_default().push(idx);
        self.incoming.entry(to).or_default().push(idx);
        self.record(Undo::Edge);
        trace!(%from, %to, %rel, "Edge created");
        Ok(())
    }

    fn related(&self, node: NodeId, rel: RelType, direction: Direction) -> Vec<NodeId> {
        self.edges_at(node, direction)
            .filter(|e| e.rel == rel)
            .map(|e| match direction {
                Direction::Outgoing => e.to,
                Direction::Incoming => e.from,
            })
            .collect()
    }

    fn edge_count(&self, rel: RelType) -> usize {
        self.edges.iter().filter(|e| e.rel == rel).count()
    }

    fn clear_relations(&mut self) -> Result<usize> {
        let removed = self.edges.len();
        let edges = std::mem::take(&mut self.edges);
        self.outgoing.clear();
        self.incoming.clear();

        let mut derived = Vec::with_capacity(self.taxa.len());
        for taxon in &mut self.taxa {
            derived.push(DerivedState {
                labels: std::mem::replace(
                    &mut taxon.labels,
                    std::collections::BTreeSet::from([Label::Taxon]),
                ),
                lft: taxon.lft.take(),
                rgt: taxon.rgt.take(),
                metrics: taxon.metrics.take(),
            });
        }

        self.record(Undo::ClearRelations { edges, derived });
        debug!(removed, "Cleared existing relations");
        Ok(removed)
    }

    fn begin(&mut self) {
        if self.undo.is_none() {
            self.undo = Some(Vec::new());
        }
    }

    fn commit(&mut self) -> Result<()> {
        if let Some(log) = self.undo.take() {
            trace!(writes = log.len(), "Committed transaction");
            self.commits += 1;
        }
        Ok(())
    }

    fn rollback(&mut self) {
        if let Some(log) = self.undo.take() {
            debug!(writes = log.len(), "Rolling back transaction");
            for undo in log.into_iter().rev() {
                self.apply_undo(undo);
            }
        }
    }
}
