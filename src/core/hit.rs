use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One row of tabular alignment output (BLAST `-outfmt 6` / FASTA36 `-m 8`).
///
/// Coordinates are 1-based as reported by the aligner. `query_start` may be
/// greater than `query_end` for hits on the reverse strand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentHit {
    /// Phage sequence being classified
    pub query_id: String,

    /// Matched spacer, the key into the spacer catalog
    pub spacer_id: String,

    pub percent_identity: f64,
    pub alignment_length: u32,
    pub mismatch_count: u32,

    /// Number of gap openings. Some aligners report negative values,
    /// which are treated as "no gap".
    pub gap_count: i32,

    pub query_start: u64,
    pub query_end: u64,
    pub subject_start: u64,
    pub subject_end: u64,
    pub e_value: f64,
    pub score: f64,
}

impl AlignmentHit {
    /// Create a hit with the fields the host resolution depends on.
    /// Identity, subject coordinates and scores are left at neutral values.
    pub fn new(
        query_id: impl Into<String>,
        spacer_id: impl Into<String>,
        alignment_length: u32,
        query_start: u64,
        query_end: u64,
    ) -> Self {
        Self {
            query_id: query_id.into(),
            spacer_id: spacer_id.into(),
            percent_identity: 100.0,
            alignment_length,
            mismatch_count: 0,
            gap_count: 0,
            query_start,
            query_end,
            subject_start: 1,
            subject_end: u64::from(alignment_length),
            e_value: 0.0,
            score: 0.0,
        }
    }

    #[must_use]
    pub fn with_mismatches(mut self, mismatch_count: u32) -> Self {
        self.mismatch_count = mismatch_count;
        self
    }

    #[must_use]
    pub fn with_gaps(mut self, gap_count: i32) -> Self {
        self.gap_count = gap_count;
        self
    }

    /// Midpoint of the hit on the query, `floor((start + end) / 2)`.
    /// Independent of the orientation of the coordinates.
    pub fn mean_position(&self) -> u64 {
        (self.query_start + self.query_end) / 2
    }

    /// True if the alignment contains no gap opening
    pub fn is_ungapped(&self) -> bool {
        self.gap_count <= 0
    }
}

/// All hits of one query sequence
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHits {
    pub query_id: String,
    pub hits: Vec<AlignmentHit>,
}

/// Group hits by query id, keeping queries in first-seen order and hits in
/// input order within each query.
pub fn group_by_query(hits: Vec<AlignmentHit>) -> Vec<QueryHits> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<QueryHits> = Vec::new();

    for hit in hits {
        if let Some(&idx) = index.get(&hit.query_id) {
            groups[idx].hits.push(hit);
        } else {
            index.insert(hit.query_id.clone(), groups.len());
            groups.push(QueryHits {
                query_id: hit.query_id.clone(),
                hits: vec![hit],
            });
        }
    }

    groups
}
