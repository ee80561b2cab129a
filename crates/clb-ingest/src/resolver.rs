//! Reference resolution
//!
//! Turns the foreign keys of every stored taxon (accepted name, parent,
//! basionym) into typed edges and ROOT/SYNONYM labels. Dangling references
//! are logged and collected, never fatal.

use clb_common::{ClbError, Label, RelType, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::NodeId;
use crate::store::TaxonStore;

/// A reference that could not be resolved against the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionWarning {
    /// Taxon carrying the reference
    pub taxon_id: String,
    pub relation: RelType,
    /// Identifier that was not found
    pub missing_id: String,
}

impl std::fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} not existing",
            self.relation.source_term(),
            self.missing_id
        )
    }
}

/// Outcome of resolving one taxon
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// `acceptedNameUsageID` was present and distinct, resolved or not
    pub is_synonym: bool,
    pub root: bool,
    /// Edges created as `(from, to, type)`
    pub edges: Vec<(NodeId, NodeId, RelType)>,
    pub warnings: Vec<ResolutionWarning>,
}

impl Resolution {
    fn edge_count(&self, rel: RelType) -> usize {
        self.edges.iter().filter(|(_, _, r)| *r == rel).count()
    }
}

/// Totals over a full resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub processed: usize,
    pub parent_edges: usize,
    pub synonym_edges: usize,
    pub basionym_edges: usize,
    pub roots: usize,
    pub synonyms: usize,
    pub warnings: Vec<ResolutionWarning>,
}

impl ResolutionStats {
    fn add(&mut self, resolution: Resolution) {
        self.processed += 1;
        self.parent_edges += resolution.edge_count(RelType::ParentOf);
        self.synonym_edges += resolution.edge_count(RelType::SynonymOf);
        self.basionym_edges += resolution.edge_count(RelType::BasionymOf);
        if resolution.root {
            self.roots += 1;
        }
        if resolution.edge_count(RelType::SynonymOf) > 0 {
            self.synonyms += 1;
        }
        self.warnings.extend(resolution.warnings);
    }
}

/// Resolves taxon references into edges and labels
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver {
    batch_size: usize,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self { batch_size: 10_000 }
    }
}

impl ReferenceResolver {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Resolve the references of a single taxon.
    ///
    /// Order matters: the accepted name decides whether the taxon is a
    /// synonym, and only non-synonyms without a parent reference become roots.
    pub fn resolve<S: TaxonStore + ?Sized>(&self, store: &mut S, node: NodeId) -> Result<Resolution> {
        let taxon = store.taxon_ref(node)?;
        let taxon_id = taxon.taxon_id.clone();
        let accepted = own_reference(&taxon_id, taxon.accepted_id.as_deref());
        let parent = own_reference(&taxon_id, taxon.parent_id.as_deref());
        let basionym = own_reference(&taxon_id, taxon.basionym_id.as_deref());

        let mut resolution = Resolution::default();

        if let Some(accepted_id) = accepted {
            resolution.is_synonym = true;
            match store.find(&accepted_id) {
                Some(target) => {
                    store.create_edge(node, target, RelType::SynonymOf)?;
                    store.add_label(node, Label::Synonym)?;
                    resolution.edges.push((node, target, RelType::SynonymOf));
                },
                None => resolution.warn(&taxon_id, RelType::SynonymOf, accepted_id),
            }
        }

        match parent {
            Some(parent_id) => match store.find(&parent_id) {
                Some(target) => {
                    store.create_edge(target, node, RelType::ParentOf)?;
                    resolution.edges.push((target, node, RelType::ParentOf));
                },
                None => resolution.warn(&taxon_id, RelType::ParentOf, parent_id),
            },
            None if !resolution.is_synonym => {
                store.add_label(node, Label::Root)?;
                resolution.root = true;
            },
            None => {},
        }

        if let Some(basionym_id) = basionym {
            match store.find(&basionym_id) {
                Some(target) => {
                    store.create_edge(target, node, RelType::BasionymOf)?;
                    resolution.edges.push((target, node, RelType::BasionymOf));
                },
                None => resolution.warn(&taxon_id, RelType::BasionymOf, basionym_id),
            }
        }

        Ok(resolution)
    }

    /// Resolve every stored taxon in insertion order, committing every
    /// `batch_size` taxa. Any error rolls back the open batch and aborts.
    pub fn resolve_all<S: TaxonStore + ?Sized>(&self, store: &mut S) -> Result<ResolutionStats> {
        let nodes = store.nodes();
        info!(taxa = nodes.len(), batch_size = self.batch_size, "Resolving taxon references");

        let mut stats = ResolutionStats::default();
        store.begin();
        for (idx, node) in nodes.into_iter().enumerate() {
            let resolution = match self.resolve(store, node) {
                Ok(resolution) => resolution,
                Err(e) => {
                    store.rollback();
                    return Err(e);
                },
            };
            stats.add(resolution);

            if (idx + 1) % self.batch_size == 0 {
                commit_batch(store)?;
                debug!(processed = stats.processed, "Committed resolution batch");
                store.begin();
            }
        }
        commit_batch(store)?;

        info!(
            processed = stats.processed,
            parent_edges = stats.parent_edges,
            synonym_edges = stats.synonym_edges,
            basionym_edges = stats.basionym_edges,
            roots = stats.roots,
            warnings = stats.warnings.len(),
            "Reference resolution complete"
        );
        Ok(stats)
    }
}

impl Resolution {
    fn warn(&mut self, taxon_id: &str, relation: RelType, missing_id: String) {
        let warning = ResolutionWarning {
            taxon_id: taxon_id.to_string(),
            relation,
            missing_id,
        };
        warn!(taxon_id, relation = %relation, "{}", warning);
        self.warnings.push(warning);
    }
}

/// A reference counts only when present and different from the taxon itself
fn own_reference(taxon_id: &str, reference: Option<&str>) -> Option<String> {
    reference
        .filter(|r| !r.trim().is_empty() && *r != taxon_id)
        .map(str::to_string)
}

/// Commit the open transaction, rolling it back if the store refuses
pub(crate) fn commit_batch<S: TaxonStore + ?Sized>(store: &mut S) -> Result<()> {
    store.commit().map_err(|e| {
        store.rollback();
        match e {
            ClbError::Commit(_) => e,
            other => ClbError::Commit(other.to_string()),
        }
    })
}
