//! Query discovery from FASTA files using noodles.
//!
//! Only record names are needed: every query listed in the input FASTA is
//! reported in the batch summary, including those without alignment hits.
//! Supports both uncompressed and gzip compressed files.

use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use noodles::fasta;

use crate::parsing::ParseError;
use crate::utils::validation::is_gzipped;

/// Read the identifiers of all records in a FASTA file, in file order.
///
/// The identifier is the first word of the definition line, which is what
/// BLAST and FASTA36 report as the query id.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles`
/// if parsing fails, or `ParseError::InvalidFormat` if the file holds no records.
pub fn read_query_ids(path: &Path) -> Result<Vec<String>, ParseError> {
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        read_query_ids_from(BufReader::new(GzDecoder::new(file)))
    } else {
        read_query_ids_from(BufReader::new(file))
    }
}

/// Read record identifiers from any buffered FASTA source
///
/// # Errors
///
/// See [`read_query_ids`].
pub fn read_query_ids_from<R: BufRead>(reader: R) -> Result<Vec<String>, ParseError> {
    let mut fasta_reader = fasta::io::Reader::new(reader);
    let mut ids = Vec::new();

    for result in fasta_reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;
        ids.push(String::from_utf8_lossy(record.name()).to_string());
    }

    if ids.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No sequences found in FASTA file".to_string(),
        ));
    }

    Ok(ids)
}
