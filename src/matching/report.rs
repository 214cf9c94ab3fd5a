//! Audit trail of a host resolution.
//!
//! The report is the only explanation of a call: which criteria were
//! evaluated, what each one observed, which spacers it eliminated and which
//! spacers support the final label.

use serde::Serialize;

use crate::core::record::HitRecord;
use crate::core::types::{Criterion, TaxonRank};

/// A host label together with its taxonomic rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostCall {
    pub label: String,
    pub rank: TaxonRank,
}

impl HostCall {
    pub fn new(label: impl Into<String>, rank: TaxonRank) -> Self {
        Self {
            label: label.into(),
            rank,
        }
    }
}

/// Number of distinct phage genome positions hit by one genus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenusVote {
    pub genus: String,
    pub distinct_positions: usize,
}

/// 5' relative position of one candidate spacer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativePosition {
    pub spacer_id: String,
    pub genus: String,
    pub value: f64,
}

/// Taxonomy of one remaining candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lineage {
    pub spacer_id: String,
    pub genus: String,
    pub family: String,
    pub order: String,
}

/// What a criterion looked at
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// Distinct genera among the candidates, first-seen order
    Genera { genera: Vec<String> },
    /// Distinct-position counts, highest first
    PositionVotes { votes: Vec<GenusVote> },
    /// Relative positions, 5'-most first
    RelativePositions { positions: Vec<RelativePosition> },
    /// Lineages of the remaining candidates
    Lineages { lineages: Vec<Lineage> },
}

/// Trace of one evaluated criterion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTrace {
    pub criterion: Criterion,
    pub observation: Observation,

    /// Spacer ids removed from consideration by this criterion
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub eliminated: Vec<String>,

    /// Genera still in play after this criterion, when it did not resolve
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub retained_genera: Vec<String>,

    /// The call, if this criterion resolved the query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<HostCall>,
}

/// A spacer a host call is based on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportingSpacer {
    pub spacer_id: String,
    pub organism_name: String,
    pub query_start: u64,
    pub query_end: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub spacer_sequence: String,
}

impl From<&HitRecord> for SupportingSpacer {
    fn from(record: &HitRecord) -> Self {
        Self {
            spacer_id: record.spacer_id().to_string(),
            organism_name: record.organism_name().to_string(),
            query_start: record.hit.query_start,
            query_end: record.hit.query_end,
            spacer_sequence: record.spacer.spacer_sequence.clone(),
        }
    }
}

/// Per-criterion trace of a resolution plus the supporting spacers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionReport {
    candidate_count: usize,
    stages: Vec<StageTrace>,
    supporting: Vec<SupportingSpacer>,
}

impl ResolutionReport {
    pub(crate) fn new(
        candidate_count: usize,
        stages: Vec<StageTrace>,
        supporting: Vec<SupportingSpacer>,
    ) -> Self {
        Self {
            candidate_count,
            stages,
            supporting,
        }
    }

    /// Number of candidates the cascade started from
    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    /// Evaluated criteria in order; the last one resolved the query
    pub fn stages(&self) -> &[StageTrace] {
        &self.stages
    }

    pub fn supporting(&self) -> &[SupportingSpacer] {
        &self.supporting
    }

    /// Trace of a given criterion, if it was reached
    pub fn stage(&self, criterion: Criterion) -> Option<&StageTrace> {
        self.stages.iter().find(|s| s.criterion == criterion)
    }

    /// The stage that produced the call
    pub fn fired_stage(&self) -> Option<&StageTrace> {
        self.stages.last()
    }
}

/// Final host call of one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    query_id: String,
    host_label: String,
    rank: TaxonRank,
    criterion: Criterion,
    confidence_level: u8,
    report: ResolutionReport,
}

impl ResolutionResult {
    pub(crate) fn new(
        query_id: impl Into<String>,
        criterion: Criterion,
        call: HostCall,
        report: ResolutionReport,
    ) -> Self {
        Self {
            query_id: query_id.into(),
            host_label: call.label,
            rank: call.rank,
            criterion,
            confidence_level: criterion.level(),
            report,
        }
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// Genus, family or order name, or `"UNKNOWN"`
    pub fn host_label(&self) -> &str {
        &self.host_label
    }

    pub fn rank(&self) -> TaxonRank {
        self.rank
    }

    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    /// 1 (strongest) to 4
    pub fn confidence_level(&self) -> u8 {
        self.confidence_level
    }

    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }
}
