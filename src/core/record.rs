use serde::Serialize;

use crate::core::hit::AlignmentHit;
use crate::core::spacer::SpacerMetadata;

/// An alignment hit joined with the metadata of the matched spacer.
///
/// `true_mismatch` is fixed at construction: the number of spacer bases not
/// covered by the alignment plus the mismatches inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitRecord {
    pub hit: AlignmentHit,
    pub spacer: SpacerMetadata,
    true_mismatch: i64,
}

impl HitRecord {
    /// Join a hit with its spacer metadata
    pub fn join(hit: AlignmentHit, spacer: SpacerMetadata) -> Self {
        let uncovered = i64::from(spacer.spacer_length) - i64::from(hit.alignment_length);
        let true_mismatch = uncovered + i64::from(hit.mismatch_count);
        Self {
            hit,
            spacer,
            true_mismatch,
        }
    }

    pub fn true_mismatch(&self) -> i64 {
        self.true_mismatch
    }

    pub fn query_id(&self) -> &str {
        &self.hit.query_id
    }

    pub fn spacer_id(&self) -> &str {
        &self.hit.spacer_id
    }

    pub fn genus(&self) -> &str {
        &self.spacer.genus
    }

    pub fn family(&self) -> &str {
        &self.spacer.family
    }

    pub fn order(&self) -> &str {
        &self.spacer.order
    }

    pub fn organism_name(&self) -> &str {
        &self.spacer.organism_name
    }

    pub fn mean_position(&self) -> u64 {
        self.hit.mean_position()
    }

    pub fn five_prime_relative_position(&self) -> f64 {
        self.spacer.five_prime_relative_position()
    }

    /// Whether the record passes the gap and mismatch filters
    pub fn within_tolerance(&self, mismatch_tolerance: u32) -> bool {
        self.hit.is_ungapped() && self.true_mismatch <= i64::from(mismatch_tolerance)
    }
}
