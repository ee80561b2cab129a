//! Shared taxonomic vocabulary used across the workspace

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

mod rank;

pub use rank::{Rank, RankKey};

/// Label attached to a taxon node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    /// Carried by every node
    Taxon,
    /// Accepted taxon without a parent reference
    Root,
    /// Taxon whose accepted name resolved to another node
    Synonym,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Taxon => write!(f, "TAXON"),
            Label::Root => write!(f, "ROOT"),
            Label::Synonym => write!(f, "SYNONYM"),
        }
    }
}

/// Directed relation types between taxa
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelType {
    /// parent -> child, the classification tree
    ParentOf,
    /// synonym -> accepted
    SynonymOf,
    /// original name -> name citing it as basionym
    BasionymOf,
}

impl RelType {
    pub const ALL: [RelType; 3] = [RelType::ParentOf, RelType::SynonymOf, RelType::BasionymOf];

    /// Name of the source term holding the foreign key for this relation
    pub fn source_term(self) -> &'static str {
        match self {
            RelType::ParentOf => "parentNameUsageID",
            RelType::SynonymOf => "acceptedNameUsageID",
            RelType::BasionymOf => "originalNameUsageID",
        }
    }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelType::ParentOf => write!(f, "PARENT_OF"),
            RelType::SynonymOf => write!(f, "SYNONYM_OF"),
            RelType::BasionymOf => write!(f, "BASIONYM_OF"),
        }
    }
}

/// Compare two optional strings with absent values first
pub fn cmp_optional_str(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    }
}
