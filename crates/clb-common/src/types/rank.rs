//! Taxonomic rank vocabulary
//!
//! Ranks are only used to order siblings and to pick classification
//! rollups; no rank-validity rules are enforced.

use serde::{Deserialize, Serialize};

/// Fixed rank vocabulary, declared from the top of the hierarchy down
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Domain,
    Superkingdom,
    Kingdom,
    Subkingdom,
    Superphylum,
    Phylum,
    Subphylum,
    Superclass,
    Class,
    Subclass,
    Superorder,
    Order,
    Suborder,
    Superfamily,
    Family,
    Subfamily,
    Tribe,
    Subtribe,
    Genus,
    Subgenus,
    Section,
    Species,
    Subspecies,
    Variety,
    Form,
}

impl Rank {
    /// Ranks that receive a classification rollup key
    pub const CLASSIFICATION: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    /// Parse a rank name, accepting common abbreviations
    pub fn parse(s: &str) -> Option<Self> {
        let rank = match s.trim().to_lowercase().as_str() {
            "domain" => Self::Domain,
            "superkingdom" => Self::Superkingdom,
            "kingdom" | "regnum" => Self::Kingdom,
            "subkingdom" => Self::Subkingdom,
            "superphylum" => Self::Superphylum,
            "phylum" | "division" => Self::Phylum,
            "subphylum" => Self::Subphylum,
            "superclass" => Self::Superclass,
            "class" => Self::Class,
            "subclass" => Self::Subclass,
            "superorder" => Self::Superorder,
            "order" => Self::Order,
            "suborder" => Self::Suborder,
            "superfamily" => Self::Superfamily,
            "family" => Self::Family,
            "subfamily" => Self::Subfamily,
            "tribe" => Self::Tribe,
            "subtribe" => Self::Subtribe,
            "genus" => Self::Genus,
            "subgenus" => Self::Subgenus,
            "section" => Self::Section,
            "species" | "sp." => Self::Species,
            "subspecies" | "subsp." | "ssp." => Self::Subspecies,
            "variety" | "varietas" | "var." => Self::Variety,
            "form" | "forma" | "f." => Self::Form,
            _ => return None,
        };
        Some(rank)
    }

    /// Position in the vocabulary, 0 being the highest rank
    pub fn depth(self) -> u32 {
        self as u32
    }

    /// Index into [`Rank::CLASSIFICATION`] if this rank carries a rollup key
    pub fn classification_index(self) -> Option<usize> {
        Self::CLASSIFICATION.iter().position(|r| *r == self)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Rank::Domain => "domain",
            Rank::Superkingdom => "superkingdom",
            Rank::Kingdom => "kingdom",
            Rank::Subkingdom => "subkingdom",
            Rank::Superphylum => "superphylum",
            Rank::Phylum => "phylum",
            Rank::Subphylum => "subphylum",
            Rank::Superclass => "superclass",
            Rank::Class => "class",
            Rank::Subclass => "subclass",
            Rank::Superorder => "superorder",
            Rank::Order => "order",
            Rank::Suborder => "suborder",
            Rank::Superfamily => "superfamily",
            Rank::Family => "family",
            Rank::Subfamily => "subfamily",
            Rank::Tribe => "tribe",
            Rank::Subtribe => "subtribe",
            Rank::Genus => "genus",
            Rank::Subgenus => "subgenus",
            Rank::Section => "section",
            Rank::Species => "species",
            Rank::Subspecies => "subspecies",
            Rank::Variety => "variety",
            Rank::Form => "form",
        };
        f.write_str(name)
    }
}

/// Sort key for a raw rank value.
///
/// Absent ranks come first, then vocabulary ranks in hierarchy order, then
/// unrecognized rank strings in natural string order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RankKey<'a> {
    Absent,
    Known(Rank),
    Unknown(&'a str),
}

impl<'a> RankKey<'a> {
    pub fn of(raw: Option<&'a str>) -> Self {
        match raw {
            None => RankKey::Absent,
            Some(s) => match Rank::parse(s) {
                Some(rank) => RankKey::Known(rank),
                None => RankKey::Unknown(s),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ranks() {
        assert_eq!(Rank::parse("Kingdom"), Some(Rank::Kingdom));
        assert_eq!(Rank::parse(" genus "), Some(Rank::Genus));
        assert_eq!(Rank::parse("var."), Some(Rank::Variety));
        assert_eq!(Rank::parse("cultivar"), None);
    }

    #[test]
    fn test_vocabulary_order() {
        assert!(Rank::Kingdom < Rank::Phylum);
        assert!(Rank::Genus < Rank::Species);
        assert!(Rank::Domain.depth() < Rank::Form.depth());
    }

    #[test]
    fn test_classification_index() {
        assert_eq!(Rank::Kingdom.classification_index(), Some(0));
        assert_eq!(Rank::Species.classification_index(), Some(6));
        assert_eq!(Rank::Tribe.classification_index(), None);
    }

    #[test]
    fn test_rank_key_order() {
        let absent = RankKey::of(None);
        let kingdom = RankKey::of(Some("kingdom"));
        let species = RankKey::of(Some("species"));
        let cultivar = RankKey::of(Some("cultivar"));
        let unranked = RankKey::of(Some("unranked"));

        assert!(absent < kingdom);
        assert!(kingdom < species);
        assert!(species < cultivar);
        assert!(cultivar < unranked);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for rank in Rank::CLASSIFICATION {
            assert_eq!(Rank::parse(&rank.to_string()), Some(rank));
        }
    }
}
