//! Parsers for the inputs of host prediction.
//!
//! - **Alignment hit tables**: BLAST `-outfmt 6` and FASTA36 `-m 8` tabular output
//! - **Spacer metadata tables**: TSV/CSV exports of the spacer catalog
//! - **Query FASTA files**: identifiers of the phage sequences to classify
//!
//! ## Example
//!
//! ```rust,no_run
//! use crispr_host_id::parsing::tabular::parse_hit_file;
//! use crispr_host_id::core::hit::group_by_query;
//! use std::path::Path;
//!
//! let hits = parse_hit_file(Path::new("phages_vs_spacers.tsv")).unwrap();
//! for query in group_by_query(hits) {
//!     println!("{}: {} hits", query.query_id, query.hits.len());
//! }
//! ```

use thiserror::Error;

pub mod fasta;
pub mod spacers;
pub mod tabular;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Too many alignment rows: {0} exceeds maximum allowed")]
    TooManyRows(usize),
}
