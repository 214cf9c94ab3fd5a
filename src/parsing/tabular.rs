//! Parser for tabular pairwise alignment output.
//!
//! Both `blastn -outfmt 6` and `fasta36 -m 8` emit twelve tab-separated
//! columns per hit:
//!
//! | # | Column | # | Column |
//! |---|--------|---|--------|
//! | 1 | query id | 7 | query start |
//! | 2 | spacer id | 8 | query end |
//! | 3 | percent identity | 9 | subject start |
//! | 4 | alignment length | 10 | subject end |
//! | 5 | mismatches | 11 | e-value |
//! | 6 | gap openings | 12 | bit score |

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use flate2::read::GzDecoder;

use crate::core::hit::AlignmentHit;
use crate::parsing::ParseError;
use crate::utils::validation::{check_hit_limit, is_gzipped};

const HIT_COLUMNS: usize = 12;

/// Parse a hit table from a file; `.gz` files are decompressed on the fly.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_hit_file(path: &Path) -> Result<Vec<AlignmentHit>, ParseError> {
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        parse_hit_reader(BufReader::new(GzDecoder::new(file)))
    } else {
        parse_hit_reader(BufReader::new(file))
    }
}

/// Parse hit table text
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` for malformed rows.
pub fn parse_hit_text(text: &str) -> Result<Vec<AlignmentHit>, ParseError> {
    parse_hit_reader(text.as_bytes())
}

/// Parse hit rows from any buffered reader.
///
/// Blank lines and `#` comment lines are skipped. An input without rows is
/// not an error here; callers decide how to report "no hits".
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a row has fewer than twelve columns
/// or a numeric column cannot be parsed, or `ParseError::TooManyRows` if the
/// row limit is exceeded.
pub fn parse_hit_reader<R: BufRead>(reader: R) -> Result<Vec<AlignmentHit>, ParseError> {
    let mut hits = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        // Line numbers in errors are 1-based for user friendliness
        let line_num = i + 1;

        if check_hit_limit(hits.len()).is_some() {
            return Err(ParseError::TooManyRows(hits.len()));
        }

        hits.push(parse_hit_line(line, line_num)?);
    }

    Ok(hits)
}

/// Read hit rows from an unbuffered source such as a child process pipe
///
/// # Errors
///
/// See [`parse_hit_reader`].
pub fn parse_hit_bytes<R: Read>(source: R) -> Result<Vec<AlignmentHit>, ParseError> {
    parse_hit_reader(BufReader::new(source))
}

fn parse_hit_line(line: &str, line_num: usize) -> Result<AlignmentHit, ParseError> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() < HIT_COLUMNS {
        return Err(ParseError::InvalidFormat(format!(
            "Line {line_num} has {} fields, expected {HIT_COLUMNS}",
            fields.len()
        )));
    }

    Ok(AlignmentHit {
        query_id: fields[0].to_string(),
        spacer_id: fields[1].to_string(),
        percent_identity: parse_field(fields[2], "percent identity", line_num)?,
        alignment_length: parse_field(fields[3], "alignment length", line_num)?,
        mismatch_count: parse_field(fields[4], "mismatch count", line_num)?,
        gap_count: parse_field(fields[5], "gap count", line_num)?,
        query_start: parse_field(fields[6], "query start", line_num)?,
        query_end: parse_field(fields[7], "query end", line_num)?,
        subject_start: parse_field(fields[8], "subject start", line_num)?,
        subject_end: parse_field(fields[9], "subject end", line_num)?,
        e_value: parse_field(fields[10], "e-value", line_num)?,
        score: parse_field(fields[11], "score", line_num)?,
    })
}

fn parse_field<T: FromStr>(value: &str, column: &str, line_num: usize) -> Result<T, ParseError> {
    value.parse().map_err(|_| {
        ParseError::InvalidFormat(format!(
            "Invalid {column} on line {line_num}: '{value}'"
        ))
    })
}
