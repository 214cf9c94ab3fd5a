use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog::store::SpacerCatalog;
use crate::core::hit::AlignmentHit;
use crate::core::record::HitRecord;
use crate::core::types::is_unknown_taxon;

/// Default number of tolerated mismatches between spacer and phage
pub const DEFAULT_MISMATCH_TOLERANCE: u32 = 1;

/// Filters applied before the resolution cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Maximum true mismatch count (uncovered spacer bases + mismatches)
    pub mismatch_tolerance: u32,
    /// Keep spacers whose organism genus is unknown
    pub keep_unknown_genus: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            mismatch_tolerance: DEFAULT_MISMATCH_TOLERANCE,
            keep_unknown_genus: false,
        }
    }
}

/// No hit of a query survived the gap and mismatch filters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Found no match between {query_id} and the spacer database that tolerates {mismatch_tolerance} mismatch(es)"
)]
pub struct NoCandidates {
    pub query_id: String,
    pub mismatch_tolerance: u32,
    /// Records that had metadata and reached the gap/mismatch filters
    pub joined_records: usize,
}

/// Join hits with their spacer metadata.
///
/// Hits whose spacer is missing from the catalog are dropped. Unless
/// `keep_unknown_genus` is set, records of unknown genus are dropped here,
/// before any mismatch filtering, so they cannot mask a single-genus match.
///
/// The result is the pre-filter table offered for export.
pub fn join_hits(
    hits: &[AlignmentHit],
    catalog: &SpacerCatalog,
    keep_unknown_genus: bool,
) -> Vec<HitRecord> {
    hits.iter()
        .filter_map(|hit| {
            catalog
                .get(&hit.spacer_id)
                .map(|spacer| HitRecord::join(hit.clone(), spacer.clone()))
        })
        .filter(|record| keep_unknown_genus || !is_unknown_taxon(record.genus()))
        .collect()
}

/// Keep ungapped records within the mismatch tolerance
pub fn filter_records<I>(records: I, mismatch_tolerance: u32) -> Vec<HitRecord>
where
    I: IntoIterator<Item = HitRecord>,
{
    records
        .into_iter()
        .filter(|record| record.within_tolerance(mismatch_tolerance))
        .collect()
}

/// The filtered hits of one query, input to the resolution cascade.
///
/// Never empty, and never modified once built: the cascade narrows it
/// through borrowed views.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    query_id: String,
    records: Vec<HitRecord>,
}

impl CandidateSet {
    /// Join, filter and collect the candidates of one query
    ///
    /// # Errors
    ///
    /// Returns `NoCandidates` if no hit survives filtering.
    pub fn build(
        query_id: &str,
        hits: &[AlignmentHit],
        catalog: &SpacerCatalog,
        config: &FilterConfig,
    ) -> Result<Self, NoCandidates> {
        let joined = join_hits(hits, catalog, config.keep_unknown_genus);
        debug!(
            "{query_id}: {} hit(s), {} with usable metadata",
            hits.len(),
            joined.len()
        );
        Self::from_joined(query_id, joined, config.mismatch_tolerance)
    }

    /// Filter an already joined table
    ///
    /// # Errors
    ///
    /// Returns `NoCandidates` if no record survives filtering.
    pub fn from_joined(
        query_id: &str,
        joined: Vec<HitRecord>,
        mismatch_tolerance: u32,
    ) -> Result<Self, NoCandidates> {
        let joined_records = joined.len();
        let records = filter_records(joined, mismatch_tolerance);
        debug!(
            "{query_id}: {}/{joined_records} record(s) within {mismatch_tolerance} mismatch(es)",
            records.len()
        );

        if records.is_empty() {
            return Err(NoCandidates {
                query_id: query_id.to_string(),
                mismatch_tolerance,
                joined_records,
            });
        }

        Ok(Self {
            query_id: query_id.to_string(),
            records,
        })
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn records(&self) -> &[HitRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a built set; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
