//! Nested-set interval index
//!
//! Every node reached by the walk gets `lft` when it is entered and `rgt`
//! when it is left, both drawn from one counter. A subtree is then the
//! interval `(lft, rgt)` and needs no recursion to query.

use std::collections::HashSet;

use clb_common::{ClbError, Result};
use tracing::debug;

use crate::models::{NodeId, Property};
use crate::store::TaxonStore;
use crate::traverse::StartEndHandler;

/// Assigns `lft`/`rgt` from a shared, monotonically increasing counter
#[derive(Debug, Default)]
pub struct NestedSetHandler {
    counter: u64,
}

impl NestedSetHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next value to hand out; twice the number of indexed nodes once the walk is done
    pub fn counter(&self) -> u64 {
        self.counter
    }

    fn next(&mut self) -> u64 {
        let value = self.counter;
        self.counter += 1;
        value
    }
}

impl<S: TaxonStore + ?Sized> StartEndHandler<S> for NestedSetHandler {
    fn start(&mut self, store: &mut S, node: NodeId, _path: &[NodeId]) -> Result<()> {
        let lft = self.next();
        store.set_property(node, Property::Lft(lft))
    }

    fn end(&mut self, store: &mut S, node: NodeId, _path: &[NodeId]) -> Result<()> {
        let rgt = self.next();
        store.set_property(node, Property::Rgt(rgt))
    }
}

/// Check that the stored intervals form a valid nested set.
///
/// Bounds must be unique and cover `0..2n`, intervals may only nest or be
/// disjoint, and each indexed child must lie inside its indexed parent.
/// Returns the number of indexed nodes.
pub fn verify_intervals<S: TaxonStore + ?Sized>(store: &S) -> Result<usize> {
    let mut intervals = Vec::new();
    for node in store.nodes() {
        let taxon = store.taxon_ref(node)?;
        match (taxon.lft, taxon.rgt) {
            (Some(lft), Some(rgt)) if lft < rgt => intervals.push((lft, rgt, node)),
            (None, None) => {},
            (lft, rgt) => {
                return Err(ClbError::malformed(format!(
                    "taxon {} has invalid interval {:?}..{:?}",
                    taxon.taxon_id, lft, rgt
                )))
            },
        }
    }

    let bound = 2 * intervals.len() as u64;
    let mut seen = HashSet::with_capacity(intervals.len() * 2);
    for (lft, rgt, node) in &intervals {
        for value in [*lft, *rgt] {
            if value >= bound || !seen.insert(value) {
                return Err(ClbError::malformed(format!(
                    "bound {} of {} is out of range or reused",
                    value, node
                )));
            }
        }
    }

    intervals.sort_unstable();
    let mut open: Vec<(u64, NodeId)> = Vec::new();
    for (lft, rgt, node) in &intervals {
        while open.last().is_some_and(|(top_rgt, _)| top_rgt < lft) {
            open.pop();
        }
        if let Some((top_rgt, top)) = open.last() {
            if rgt > top_rgt {
                return Err(ClbError::malformed(format!(
                    "interval of {} overlaps {}",
                    node, top
                )));
            }
        }
        open.push((*rgt, *node));
    }

    for (lft, rgt, node) in &intervals {
        let Some(parent) = store.parent_of(*node) else {
            continue;
        };
        let parent = store.taxon_ref(parent)?;
        match parent.interval() {
            Some((plft, prgt)) if plft < *lft && *rgt < prgt => {},
            _ => {
                return Err(ClbError::malformed(format!(
                    "{} is not nested inside its parent {}",
                    node, parent.node
                )))
            },
        }
    }

    debug!(indexed = intervals.len(), "Nested-set intervals verified");
    Ok(intervals.len())
}

/// All indexed nodes strictly inside `node`'s interval, in `lft` order
pub fn descendants<S: TaxonStore + ?Sized>(store: &S, node: NodeId) -> Result<Vec<NodeId>> {
    let Some((lft, rgt)) = store.taxon_ref(node)?.interval() else {
        return Ok(Vec::new());
    };
    Ok(indexed_where(store, |olft, orgt| lft < olft && orgt < rgt))
}

/// All indexed nodes whose interval contains `node`'s, root first
pub fn ancestors<S: TaxonStore + ?Sized>(store: &S, node: NodeId) -> Result<Vec<NodeId>> {
    let Some((lft, rgt)) = store.taxon_ref(node)?.interval() else {
        return Ok(Vec::new());
    };
    Ok(indexed_where(store, |olft, orgt| olft < lft && rgt < orgt))
}

/// Indexed nodes ordered by `lft`
pub fn in_lft_order<S: TaxonStore + ?Sized>(store: &S) -> Vec<NodeId> {
    indexed_where(store, |_, _| true)
}

fn indexed_where<S, F>(store: &S, keep: F) -> Vec<NodeId>
where
    S: TaxonStore + ?Sized,
    F: Fn(u64, u64) -> bool,
{
    let mut hits: Vec<(u64, NodeId)> = store
        .nodes()
        .into_iter()
        .filter_map(|n| {
            let (lft, rgt) = store.taxon(n)?.interval()?;
            keep(lft, rgt).then_some((lft, n))
        })
        .collect();
    hits.sort_unstable();
    hits.into_iter().map(|(_, n)| n).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::TaxonRecord;
    use crate::store::MemoryStore;
    use crate::traverse::{FixedPaths, TaxonWalker};
    use clb_common::RelType;

    fn indexed_chain() -> (MemoryStore, Vec<NodeId>) {
        let mut store = MemoryStore::new();
        let n: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| store.insert(TaxonRecord::new(*id)).unwrap())
            .collect();
        store.create_edge(n[0], n[1], RelType::ParentOf).unwrap();
        store.create_edge(n[1], n[2], RelType::ParentOf).unwrap();
        store.create_edge(n[0], n[3], RelType::ParentOf).unwrap();

        let mut handler = NestedSetHandler::new();
        let mut source = FixedPaths::new(vec![
            vec![n[0]],
            vec![n[0], n[1]],
            vec![n[0], n[1], n[2]],
            vec![n[0], n[3]],
        ]);
        let mut handlers: [&mut dyn StartEndHandler<MemoryStore>; 1] = [&mut handler];
        TaxonWalker::default()
            .walk(&mut store, &mut source, &mut handlers)
            .unwrap();
        assert_eq!(handler.counter(), 8);
        (store, n)
    }

    #[test]
    fn test_intervals_assigned() {
        let (store, n) = indexed_chain();
        let interval = |i: usize| store.taxon(n[i]).unwrap().interval().unwrap();
        assert_eq!(interval(0), (0, 7));
        assert_eq!(interval(1), (1, 4));
        assert_eq!(interval(2), (2, 3));
        assert_eq!(interval(3), (5, 6));
        assert_eq!(verify_intervals(&store).unwrap(), 4);
    }

    #[test]
    fn test_interval_queries() {
        let (store, n) = indexed_chain();
        assert_eq!(descendants(&store, n[0]).unwrap(), vec![n[1], n[2], n[3]]);
        assert_eq!(descendants(&store, n[3]).unwrap(), vec![]);
        assert_eq!(ancestors(&store, n[2]).unwrap(), vec![n[0], n[1]]);
        assert_eq!(in_lft_order(&store), vec![n[0], n[1], n[2], n[3]]);
    }

    #[test]
    fn test_verify_rejects_overlap() {
        let (mut store, n) = indexed_chain();
        // b = (1, 4) and d = (5, 6) become (1, 5) and (4, 6)
        store.set_property(n[1], Property::Rgt(5)).unwrap();
        store.set_property(n[3], Property::Lft(4)).unwrap();
        let err = verify_intervals(&store).unwrap_err();
        assert!(matches!(err, ClbError::MalformedTraversal(_)));
    }

    #[test]
    fn test_verify_rejects_half_interval() {
        let mut store = MemoryStore::new();
        let a = store.insert(TaxonRecord::new("a")).unwrap();
        store.set_property(a, Property::Lft(0)).unwrap();
        assert!(verify_intervals(&store).is_err());
    }

    #[test]
    fn test_verify_rejects_child_outside_parent() {
        let (mut store, n) = indexed_chain();
        // swap c and d intervals: still laminar, but c leaves its parent b
        store.set_property(n[2], Property::Lft(5)).unwrap();
        store.set_property(n[2], Property::Rgt(6)).unwrap();
        store.set_property(n[3], Property::Lft(2)).unwrap();
        store.set_property(n[3], Property::Rgt(3)).unwrap();
        let err = verify_intervals(&store).unwrap_err();
        assert!(err.to_string().contains("not nested"));
    }
}
