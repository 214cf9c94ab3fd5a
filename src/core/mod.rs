//! Core data types for CRISPR spacer based host prediction.
//!
//! - [`AlignmentHit`]: One row of tabular aligner output (query vs. spacer)
//! - [`SpacerMetadata`]: Organism and taxonomy attached to a catalogued spacer
//! - [`HitRecord`]: An alignment hit joined with its spacer metadata
//! - [`Criterion`], [`TaxonRank`]: Classification of a host call
//!
//! Taxonomy fields that are not known carry the sentinel `"Unknown"`
//! ([`types::UNKNOWN_TAXON`]). A query whose candidates share no family or
//! order is reported with the host label `"UNKNOWN"` ([`types::UNRESOLVED_HOST`]).

pub mod hit;
pub mod record;
pub mod spacer;
pub mod types;

pub use hit::{AlignmentHit, QueryHits};
pub use record::HitRecord;
pub use spacer::SpacerMetadata;
pub use types::{Criterion, TaxonRank};
