//! Parser for spacer metadata tables.
//!
//! Expected columns, tab- or comma-separated:
//!
//! ```text
//! spacer_id  organism_id  organism_name  species  genus  family  order
//! spacer_sequence  spacer_length  array_spacer_count  position_in_locus
//! ```
//!
//! A header line starting with `spacer_id` is optional. Empty taxonomy cells
//! are read as `"Unknown"`. Fields may be double-quoted, so organism names
//! containing the delimiter survive a CSV export.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::core::spacer::SpacerMetadata;
use crate::core::types::UNKNOWN_TAXON;
use crate::parsing::ParseError;

const SPACER_COLUMNS: usize = 11;

/// Parse a spacer metadata file. The delimiter is a comma for `.csv`
/// files and a tab otherwise.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or
/// `ParseError::InvalidFormat` if the content is invalid.
pub fn parse_spacer_file(path: &Path) -> Result<Vec<SpacerMetadata>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    parse_spacer_text(&content, if is_csv { b',' } else { b'\t' })
}

/// Parse spacer metadata text
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a line has fewer than eleven fields,
/// contains an invalid number or broken quoting, or describes an impossible
/// array position.
pub fn parse_spacer_text(text: &str, delimiter: u8) -> Result<Vec<SpacerMetadata>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut spacers = Vec::new();
    let mut first_data_line = true;

    for record in reader.records() {
        let record = record.map_err(|e| ParseError::InvalidFormat(e.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        if first_data_line {
            first_data_line = false;
            if record
                .get(0)
                .is_some_and(|f| f.eq_ignore_ascii_case("spacer_id"))
            {
                continue;
            }
        }

        let line_num = record.position().map_or(0, |p| p.line());
        spacers.push(spacer_from_record(&record, line_num)?);
    }

    Ok(spacers)
}

fn spacer_from_record(record: &StringRecord, line_num: u64) -> Result<SpacerMetadata, ParseError> {
    if record.len() < SPACER_COLUMNS {
        return Err(ParseError::InvalidFormat(format!(
            "Line {line_num} has {} fields, expected {SPACER_COLUMNS}",
            record.len()
        )));
    }
    let field = |i: usize| record.get(i).unwrap_or_default();

    let spacer = SpacerMetadata {
        spacer_id: field(0).to_string(),
        organism_id: field(1).to_string(),
        organism_name: taxon(field(2)),
        species: taxon(field(3)),
        genus: taxon(field(4)),
        family: taxon(field(5)),
        order: taxon(field(6)),
        spacer_sequence: field(7).to_string(),
        spacer_length: parse_count(field(8), "spacer length", line_num)?,
        array_spacer_count: parse_count(field(9), "array spacer count", line_num)?,
        position_in_locus: parse_count(field(10), "position in locus", line_num)?,
    };

    if !spacer.has_valid_position() {
        return Err(ParseError::InvalidFormat(format!(
            "Line {line_num}: spacer position {} is outside an array of {} spacer(s)",
            spacer.position_in_locus, spacer.array_spacer_count
        )));
    }
    Ok(spacer)
}

fn taxon(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN_TAXON.to_string()
    } else {
        value.to_string()
    }
}

fn parse_count(value: &str, column: &str, line_num: u64) -> Result<u32, ParseError> {
    value.parse().map_err(|_| {
        ParseError::InvalidFormat(format!(
            "Invalid {column} on line {line_num}: '{value}'"
        ))
    })
}
