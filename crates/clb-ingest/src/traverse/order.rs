//! Deterministic sibling ordering

use std::cmp::Ordering;

use clb_common::types::cmp_optional_str;

use crate::models::{NodeId, Taxon};
use crate::store::TaxonStore;

/// Orders siblings by rank, then scientific name, then identifier.
///
/// Ranks follow the vocabulary order of [`clb_common::Rank`]. A missing rank
/// sorts first and unrecognized rank strings sort after every known rank.
/// Missing names sort before present ones.
///
/// Known ranks compare by taxonomic level, not as strings: `kingdom` sorts
/// before `class` even though plain string order would put it after.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxonomicOrder;

impl TaxonomicOrder {
    pub fn compare(a: &Taxon, b: &Taxon) -> Ordering {
        a.rank_key()
            .cmp(&b.rank_key())
            .then_with(|| cmp_optional_str(a.scientific_name.as_deref(), b.scientific_name.as_deref()))
            .then_with(|| a.taxon_id.cmp(&b.taxon_id))
    }

    /// Siblings in walk order
    pub fn order(mut taxa: Vec<Taxon>) -> Vec<Taxon> {
        taxa.sort_by(Self::compare);
        taxa
    }

    /// Sort node ids by the taxa they point at; unknown ids go last
    pub fn sort<S: TaxonStore + ?Sized>(store: &S, nodes: &mut [NodeId]) {
        nodes.sort_by(|a, b| match (store.taxon(*a), store.taxon(*b)) {
            (Some(a), Some(b)) => Self::compare(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::TaxonRecord;
    use crate::store::MemoryStore;

    fn taxon(id: &str, rank: Option<&str>, name: Option<&str>) -> Taxon {
        let mut record = TaxonRecord::new(id);
        record.taxon_rank = rank.map(str::to_string);
        record.scientific_name = name.map(str::to_string);
        Taxon::from_record(NodeId::new(0), record)
    }

    fn ids(taxa: &[Taxon]) -> Vec<&str> {
        taxa.iter().map(|t| t.taxon_id.as_str()).collect()
    }

    #[test]
    fn test_rank_before_name() {
        let taxa = vec![
            taxon("1", Some("species"), Some("Abies alba")),
            taxon("2", Some("genus"), Some("Picea")),
            taxon("3", Some("family"), Some("Pinaceae")),
        ];
        let taxa = TaxonomicOrder::order(taxa);
        assert_eq!(ids(&taxa), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_absent_and_unknown_ranks() {
        let taxa = vec![
            taxon("u2", Some("zzz"), Some("A")),
            taxon("k", Some("kingdom"), Some("A")),
            taxon("u1", Some("cultivar"), Some("A")),
            taxon("none", None, Some("Z")),
        ];
        let taxa = TaxonomicOrder::order(taxa);
        assert_eq!(ids(&taxa), vec!["none", "k", "u1", "u2"]);
    }

    #[test]
    fn test_name_then_identifier() {
        let taxa = vec![
            taxon("b", Some("genus"), Some("Abies")),
            taxon("c", Some("genus"), None),
            taxon("a", Some("genus"), Some("Abies")),
            taxon("d", Some("genus"), Some("Aa")),
        ];
        let taxa = TaxonomicOrder::order(taxa);
        assert_eq!(ids(&taxa), vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_order_is_independent_of_input_order() {
        let base = vec![
            taxon("1", Some("order"), Some("Pinales")),
            taxon("2", None, None),
            taxon("3", Some("order"), Some("Cupressales")),
            taxon("4", Some("weird"), None),
        ];
        let backward: Vec<_> = base.iter().rev().cloned().collect();
        assert_eq!(TaxonomicOrder::order(base), TaxonomicOrder::order(backward));
    }

    #[test]
    fn test_sort_node_ids() {
        let mut store = MemoryStore::new();
        let x = store.insert(TaxonRecord::new("x").with_rank("species").with_name("B")).unwrap();
        let y = store.insert(TaxonRecord::new("y").with_rank("species").with_name("A")).unwrap();
        let mut nodes = vec![NodeId::new(42), x, y];
        TaxonomicOrder::sort(&store, &mut nodes);
        assert_eq!(nodes, vec![y, x, NodeId::new(42)]);
    }
}
