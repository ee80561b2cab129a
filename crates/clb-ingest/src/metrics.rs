//! Usage metrics rollup
//!
//! Runs on the same start/end events as the nested-set handler and writes a
//! [`UsageMetrics`] summary for every node when it is closed.

use clb_common::{ClbError, Label, Result};
use tracing::trace;

use crate::models::{NodeId, Property, UsageMetrics};
use crate::store::TaxonStore;
use crate::traverse::StartEndHandler;

#[derive(Debug)]
struct OpenNode {
    node: NodeId,
    metrics: UsageMetrics,
}

/// Accumulates child counts and classification keys along the open path
#[derive(Debug, Default)]
pub struct UsageMetricsHandler {
    open: Vec<OpenNode>,
    written: usize,
}

impl UsageMetricsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes that received metrics
    pub fn written(&self) -> usize {
        self.written
    }
}

impl<S: TaxonStore + ?Sized> StartEndHandler<S> for UsageMetricsHandler {
    fn start(&mut self, store: &mut S, node: NodeId, path: &[NodeId]) -> Result<()> {
        let depth = path.len().saturating_sub(1);
        if depth != self.open.len() || path.last() != Some(&node) {
            return Err(ClbError::malformed(format!(
                "start of {} at depth {} with {} open nodes",
                node,
                depth,
                self.open.len()
            )));
        }

        let mut metrics = UsageMetrics::default();
        if let Some(parent) = self.open.last_mut() {
            if path[depth - 1] != parent.node {
                return Err(ClbError::malformed(format!(
                    "start of {} below {} which is not open",
                    node,
                    path[depth - 1]
                )));
            }
            parent.metrics.children += 1;
            metrics.classification = parent.metrics.classification;
        }

        if let Some(idx) = store.taxon_ref(node)?.rank().and_then(|r| r.classification_index()) {
            metrics.classification[idx] = Some(node);
        }

        self.open.push(OpenNode { node, metrics });
        Ok(())
    }

    fn end(&mut self, store: &mut S, node: NodeId, _path: &[NodeId]) -> Result<()> {
        let Some(OpenNode { node: open, mut metrics }) = self.open.pop() else {
            return Err(ClbError::malformed(format!("end of {} with nothing open", node)));
        };
        if open != node {
            return Err(ClbError::malformed(format!(
                "end of {} while {} is open",
                node, open
            )));
        }

        metrics.synonyms = store
            .synonyms_of(node)
            .into_iter()
            .filter(|s| store.has_label(*s, Label::Synonym))
            .count() as u32;

        trace!(%node, children = metrics.children, synonyms = metrics.synonyms, "Usage metrics");
        store.set_property(node, Property::Metrics(metrics))?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::TaxonRecord;
    use crate::resolver::ReferenceResolver;
    use crate::store::MemoryStore;
    use crate::traverse::{TaxonWalker, TaxonomicPaths};
    use clb_common::Rank;

    fn build() -> MemoryStore {
        let mut store = MemoryStore::new();
        for record in [
            TaxonRecord::new("k").with_rank("kingdom").with_name("Plantae"),
            TaxonRecord::new("f").with_rank("family").with_name("Pinaceae").with_parent("k"),
            TaxonRecord::new("g").with_rank("genus").with_name("Abies").with_parent("f"),
            TaxonRecord::new("s1").with_rank("species").with_name("Abies alba").with_parent("g"),
            TaxonRecord::new("s2").with_rank("species").with_name("Abies grandis").with_parent("g"),
            TaxonRecord::new("v").with_rank("variety").with_name("Abies alba var. x").with_parent("s1"),
            TaxonRecord::new("syn1").with_name("Abies pectinata").with_accepted("s1"),
            TaxonRecord::new("syn2").with_name("Picea pectinata").with_accepted("s1"),
        ] {
            store.insert(record).unwrap();
        }
        ReferenceResolver::default().resolve_all(&mut store).unwrap();

        let mut handler = UsageMetricsHandler::new();
        let mut source = TaxonomicPaths::new(&store);
        let mut handlers: [&mut dyn StartEndHandler<MemoryStore>; 1] = [&mut handler];
        TaxonWalker::default()
            .walk(&mut store, &mut source, &mut handlers)
            .unwrap();
        assert_eq!(handler.written(), 6);
        store
    }

    fn metrics(store: &MemoryStore, id: &str) -> Option<UsageMetrics> {
        store.taxon(store.find(id).unwrap()).unwrap().metrics
    }

    #[test]
    fn test_children_and_synonyms() {
        let store = build();
        let g = metrics(&store, "g").unwrap();
        assert_eq!(g.children, 2);
        assert_eq!(g.synonyms, 0);

        let s1 = metrics(&store, "s1").unwrap();
        assert_eq!(s1.children, 1);
        assert_eq!(s1.synonyms, 2);

        assert_eq!(metrics(&store, "v").unwrap().children, 0);
        assert_eq!(metrics(&store, "syn1"), None);
    }

    #[test]
    fn test_classification_rollup() {
        let store = build();
        let k = store.find("k").unwrap();
        let f = store.find("f").unwrap();
        let g = store.find("g").unwrap();
        let s1 = store.find("s1").unwrap();

        let v = metrics(&store, "v").unwrap();
        assert_eq!(v.kingdom_key(), Some(k));
        assert_eq!(v.key(Rank::Phylum), None);
        assert_eq!(v.family_key(), Some(f));
        assert_eq!(v.genus_key(), Some(g));
        assert_eq!(v.key(Rank::Species), Some(s1));

        let family = metrics(&store, "f").unwrap();
        assert_eq!(family.family_key(), Some(f));
        assert_eq!(family.genus_key(), None);
    }

    #[test]
    fn test_inconsistent_events_rejected() {
        let mut store = MemoryStore::new();
        let a = store.insert(TaxonRecord::new("a")).unwrap();
        let b = store.insert(TaxonRecord::new("b")).unwrap();
        let mut handler = UsageMetricsHandler::new();

        let err = handler.start(&mut store, b, &[a, b]).unwrap_err();
        assert!(matches!(err, ClbError::MalformedTraversal(_)));

        handler.start(&mut store, a, &[a]).unwrap();
        let err = StartEndHandler::<MemoryStore>::end(&mut handler, &mut store, b, &[b]).unwrap_err();
        assert!(matches!(err, ClbError::MalformedTraversal(_)));
    }
}
