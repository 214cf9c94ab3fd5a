//! Host resolution.
//!
//! This module turns the alignment hits of a phage query into a host call:
//!
//! - [`CandidateSet`]: hits joined with spacer metadata, then filtered
//! - [`resolve`]: the four-criteria resolution cascade
//! - [`ResolutionResult`]: the call plus its [`ResolutionReport`]
//! - [`BatchResolver`]: independent resolution of many queries
//!
//! ## Filtering
//!
//! A hit becomes a candidate when its spacer is in the catalog, its genus is
//! known (unless unknown genera are kept), it has no gap and its true
//! mismatch count (spacer bases outside the alignment plus mismatches inside
//! it) is within the tolerance.
//!
//! ## Cascade
//!
//! 1. **Unanimous genus**: all candidates share one genus
//! 2. **Distinct-position vote**: one genus hits strictly more distinct
//!    phage positions than any other
//! 3. **5' position**: the genus of the spacer(s) closest to the 5' end of
//!    their array, among the genera tied at criterion 2
//! 4. **Last common ancestor**: the shared family, else the shared order,
//!    else `"UNKNOWN"`
//!
//! The criterion that fires is the confidence level of the call, 1 being the
//! strongest.
//!
//! ## Example
//!
//! ```rust,no_run
//! use crispr_host_id::catalog::store::SpacerCatalog;
//! use crispr_host_id::matching::{BatchResolver, FilterConfig};
//! use crispr_host_id::parsing::tabular::parse_hit_file;
//! use crispr_host_id::core::hit::group_by_query;
//! use std::path::Path;
//!
//! let catalog = SpacerCatalog::load_from_table(Path::new("spacers.tsv")).unwrap();
//! let queries = group_by_query(parse_hit_file(Path::new("hits.m8")).unwrap());
//!
//! let resolver = BatchResolver::new(&catalog, FilterConfig::default());
//! for outcome in resolver.resolve_all(&queries, None).outcomes {
//!     if let Some(result) = outcome.result() {
//!         println!("{}: {} (level {})",
//!             result.query_id(),
//!             result.host_label(),
//!             result.confidence_level()
//!         );
//!     }
//! }
//! ```

pub mod batch;
pub mod candidates;
pub mod cascade;
pub mod report;

pub use batch::{BatchResolver, BatchSummary, QueryOutcome};
pub use candidates::{CandidateSet, FilterConfig, NoCandidates};
pub use cascade::resolve;
pub use report::{ResolutionReport, ResolutionResult};
