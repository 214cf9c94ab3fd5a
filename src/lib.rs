//! # crispr-host-id
//!
//! A library for predicting the bacterial host of a phage from CRISPR spacer matches.
//!
//! Bacteria keep fragments of past phage infections as spacers in their CRISPR
//! arrays. A phage genome that matches a spacer has most likely infected the
//! organism carrying it, or a close relative.
//!
//! `crispr-host-id` aligns phage genomes against a spacer database, joins the
//! hits with the taxonomy and array position of each spacer, and resolves a
//! single host per phage through a cascade of four criteria, reporting which
//! criterion decided the call.
//!
//! ## Features
//!
//! - **Aligner integration**: BLAST (`blastn`) or FASTA36, or a precomputed tabular alignment
//! - **Spacer catalogs**: SQLite (CrisprOpenDB layout), TSV/CSV tables or JSON exports
//! - **Mismatch-aware filtering**: uncovered spacer bases count as mismatches
//! - **Audit trail**: every evaluated criterion is recorded in the resolution report
//! - **Parallel batches**: queries are resolved independently on a thread pool
//!
//! ## Example
//!
//! ```rust,no_run
//! use crispr_host_id::{BatchResolver, FilterConfig, SpacerCatalog};
//! use crispr_host_id::core::hit::group_by_query;
//! use crispr_host_id::parsing::tabular::parse_hit_text;
//!
//! // Load spacer metadata from a TSV table
//! let catalog = SpacerCatalog::load_from_table(std::path::Path::new("spacers.tsv")).unwrap();
//!
//! // Parse BLAST tabular output
//! let hits = parse_hit_text("phage1\tNC_002695_1_3\t100.0\t32\t0\t0\t100\t131\t1\t32\t1e-10\t60.2\n").unwrap();
//!
//! // Resolve hosts
//! let resolver = BatchResolver::new(&catalog, FilterConfig::default());
//! let summary = resolver.resolve_all(&group_by_query(hits), None);
//!
//! for outcome in &summary.outcomes {
//!     if let Some(result) = outcome.result() {
//!         println!("{}: {} (confidence level {})", result.query_id(), result.host_label(), result.confidence_level());
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`aligner`]: BLAST and FASTA36 invocation
//! - [`catalog`]: Spacer metadata sources
//! - [`core`]: Alignment hits, spacer metadata and joined records
//! - [`matching`]: Candidate filtering and the resolution cascade
//! - [`parsing`]: Parsers for alignment tables, metadata tables and FASTA
//! - [`cli`]: Command-line interface implementation

pub mod aligner;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use catalog::store::SpacerCatalog;
pub use catalog::MetadataSource;
pub use core::hit::{AlignmentHit, QueryHits};
pub use core::record::HitRecord;
pub use core::spacer::SpacerMetadata;
pub use core::types::*;
pub use matching::{
    resolve, BatchResolver, BatchSummary, CandidateSet, FilterConfig, QueryOutcome,
    ResolutionReport, ResolutionResult,
};
