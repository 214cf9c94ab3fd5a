use serde::{Deserialize, Serialize};

/// Sentinel stored in taxonomy fields when the rank is not known.
pub const UNKNOWN_TAXON: &str = "Unknown";

/// Host label returned when no common ancestor can be found.
pub const UNRESOLVED_HOST: &str = "UNKNOWN";

/// Check whether a taxonomy value is the unknown sentinel
#[must_use]
pub fn is_unknown_taxon(value: &str) -> bool {
    value == UNKNOWN_TAXON
}

/// Criterion of the resolution cascade, in evaluation order.
///
/// The criterion that resolves a query doubles as its confidence level:
/// lower is stronger evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Every candidate belongs to the same genus
    UnanimousGenus,
    /// One genus hits strictly more distinct positions on the phage genome
    DistinctPositionVote,
    /// One genus owns the 5'-most spacer(s) relative to their arrays
    FivePrimePosition,
    /// Shared family or order of the remaining candidates
    LastCommonAncestor,
}

impl Criterion {
    /// Confidence level (1-4) reported for a call made by this criterion
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::UnanimousGenus => 1,
            Self::DistinctPositionVote => 2,
            Self::FivePrimePosition => 3,
            Self::LastCommonAncestor => 4,
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::UnanimousGenus => "If only one genus, it is the host",
            Self::DistinctPositionVote => "Number of different positions on phage genome",
            Self::FivePrimePosition => {
                "If number of positions is equal for multiple genera, find relative position most in 5'"
            }
            Self::LastCommonAncestor => "Last common ancestor (does not return a genus)",
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "criterion #{}", self.level())
    }
}

/// Taxonomic rank of a host call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonRank {
    Genus,
    Family,
    Order,
    /// No common ancestor; the label is [`UNRESOLVED_HOST`]
    Unresolved,
}

impl std::fmt::Display for TaxonRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Genus => write!(f, "genus"),
            Self::Family => write!(f, "family"),
            Self::Order => write!(f, "order"),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}
