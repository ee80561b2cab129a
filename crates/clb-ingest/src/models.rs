//! Checklist data models

use clb_common::{Label, Rank, RankKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Store-assigned key of a taxon node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Normalize a raw source value.
///
/// Blank values and null placeholders (`NULL`, `\N`, `\NULL`, any case)
/// become `None`; everything else is trimmed.
pub fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "null" | "\\n" | "\\null" => None,
        _ => Some(trimmed.to_string()),
    }
}

fn normalize_opt(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(normalize)
}

/// A flat input record as delivered by ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonRecord {
    /// Stable identifier (taxonID)
    pub taxon_id: String,
    pub scientific_name: Option<String>,
    pub taxon_rank: Option<String>,
    /// parentNameUsageID
    pub parent_id: Option<String>,
    /// acceptedNameUsageID
    pub accepted_id: Option<String>,
    /// originalNameUsageID
    pub basionym_id: Option<String>,
    /// Any other source term and its value
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl TaxonRecord {
    pub fn new(taxon_id: impl Into<String>) -> Self {
        Self {
            taxon_id: taxon_id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.scientific_name = Some(name.into());
        self
    }

    pub fn with_rank(mut self, rank: impl Into<String>) -> Self {
        self.taxon_rank = Some(rank.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_accepted(mut self, accepted_id: impl Into<String>) -> Self {
        self.accepted_id = Some(accepted_id.into());
        self
    }

    pub fn with_basionym(mut self, basionym_id: impl Into<String>) -> Self {
        self.basionym_id = Some(basionym_id.into());
        self
    }

    pub fn with_property(mut self, term: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(term.into(), value.into());
        self
    }

    /// Apply [`normalize`] to every field; returns `None` if the identifier itself is null-like
    pub fn normalized(self) -> Option<Self> {
        let taxon_id = normalize(&self.taxon_id)?;
        let properties = self
            .properties
            .into_iter()
            .filter_map(|(term, value)| normalize(&value).map(|v| (term, v)))
            .collect();

        Some(Self {
            taxon_id,
            scientific_name: normalize_opt(self.scientific_name),
            taxon_rank: normalize_opt(self.taxon_rank),
            parent_id: normalize_opt(self.parent_id),
            accepted_id: normalize_opt(self.accepted_id),
            basionym_id: normalize_opt(self.basionym_id),
            properties,
        })
    }
}

/// Derived per-node summary written by the usage metrics pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Nearest node at each rank of [`Rank::CLASSIFICATION`], self included
    pub classification: [Option<NodeId>; 7],
    /// Direct accepted children in the tree
    pub children: u32,
    /// Synonyms pointing at this node
    pub synonyms: u32,
}

impl UsageMetrics {
    /// Rollup key for a classification rank
    pub fn key(&self, rank: Rank) -> Option<NodeId> {
        rank.classification_index()
            .and_then(|idx| self.classification[idx])
    }

    pub fn kingdom_key(&self) -> Option<NodeId> {
        self.key(Rank::Kingdom)
    }

    pub fn family_key(&self) -> Option<NodeId> {
        self.key(Rank::Family)
    }

    pub fn genus_key(&self) -> Option<NodeId> {
        self.key(Rank::Genus)
    }
}

/// A writable property of a stored taxon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Lft(u64),
    Rgt(u64),
    Metrics(UsageMetrics),
    Term { term: String, value: String },
}

/// A taxon node held by a [`crate::store::TaxonStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    pub node: NodeId,
    pub taxon_id: String,
    pub scientific_name: Option<String>,
    pub taxon_rank: Option<String>,
    pub parent_id: Option<String>,
    pub accepted_id: Option<String>,
    pub basionym_id: Option<String>,
    pub labels: BTreeSet<Label>,
    pub lft: Option<u64>,
    pub rgt: Option<u64>,
    pub metrics: Option<UsageMetrics>,
    pub properties: BTreeMap<String, String>,
}

impl Taxon {
    pub fn from_record(node: NodeId, record: TaxonRecord) -> Self {
        Self {
            node,
            taxon_id: record.taxon_id,
            scientific_name: record.scientific_name,
            taxon_rank: record.taxon_rank,
            parent_id: record.parent_id,
            accepted_id: record.accepted_id,
            basionym_id: record.basionym_id,
            labels: BTreeSet::from([Label::Taxon]),
            lft: None,
            rgt: None,
            metrics: None,
            properties: record.properties,
        }
    }

    pub fn has_label(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }

    pub fn rank(&self) -> Option<Rank> {
        self.taxon_rank.as_deref().and_then(Rank::parse)
    }

    pub fn rank_key(&self) -> RankKey<'_> {
        RankKey::of(self.taxon_rank.as_deref())
    }

    /// Nested-set interval, present once the node has been indexed
    pub fn interval(&self) -> Option<(u64, u64)> {
        self.lft.zip(self.rgt)
    }

    /// True if `other` lies strictly inside this node's subtree
    pub fn is_ancestor_of(&self, other: &Taxon) -> bool {
        match (self.interval(), other.interval()) {
            (Some((lft, rgt)), Some((olft, orgt))) => lft < olft && orgt < rgt,
            _ => false,
        }
    }

    /// Number of descendants implied by the interval width
    pub fn descendant_count(&self) -> Option<u64> {
        self.interval().map(|(lft, rgt)| (rgt - lft - 1) / 2)
    }

    /// Human readable label used in logs
    pub fn display_name(&self) -> &str {
        self.scientific_name.as_deref().unwrap_or(&self.taxon_id)
    }
}
