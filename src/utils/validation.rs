//! Centralized validation and helper functions.

use std::path::Path;

/// Maximum number of alignment rows accepted from a single hit table (DOS protection)
pub const MAX_HIT_ROWS: usize = 5_000_000;

/// Largest mismatch tolerance accepted by the command line
pub const MAX_MISMATCH_TOLERANCE: u32 = 5;

/// Maximum length of a file name derived from a query id
pub const MAX_FILENAME_LENGTH: usize = 255;

const TABLE_EXTENSION: &str = ".tsv";

/// Check if adding another hit row would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new row.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_hit_limit(count: usize) -> Option<String> {
    if count >= MAX_HIT_ROWS {
        Some(format!(
            "Too many alignment rows: adding another would exceed maximum of {MAX_HIT_ROWS}"
        ))
    } else {
        None
    }
}

/// Validation error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty query id cannot be used as a file name")]
    EmptyFilename,
    #[error("Query id '{0}' does not contain any usable file name characters")]
    InvalidFilename(String),
    #[error("Mismatch tolerance {0} is outside the supported range 0..={MAX_MISMATCH_TOLERANCE}")]
    MismatchOutOfRange(u32),
}

/// Check a mismatch tolerance against the range the `--mismatch` option
/// accepts. `FilterConfig` itself takes any tolerance.
///
/// # Errors
///
/// Returns `ValidationError::MismatchOutOfRange` above [`MAX_MISMATCH_TOLERANCE`].
pub fn validate_mismatch_tolerance(tolerance: u32) -> Result<u32, ValidationError> {
    if tolerance > MAX_MISMATCH_TOLERANCE {
        return Err(ValidationError::MismatchOutOfRange(tolerance));
    }
    Ok(tolerance)
}

/// Derive a safe file name for the joined-table export of a query.
///
/// Query ids are FASTA identifiers and routinely contain `|`, `/` or spaces.
/// Every character outside `[A-Za-z0-9._-]` is replaced with `_`, leading dots
/// are stripped so the result can never be hidden or escape the output
/// directory, and the name is truncated to fit [`MAX_FILENAME_LENGTH`].
///
/// # Errors
///
/// Returns `ValidationError::EmptyFilename` for blank ids and
/// `ValidationError::InvalidFilename` if nothing usable remains.
pub fn query_table_filename(query_id: &str) -> Result<String, ValidationError> {
    let trimmed = query_id.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    let sanitized: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.chars().all(|c| c == '_' || c == '.') {
        return Err(ValidationError::InvalidFilename(query_id.to_string()));
    }

    let max_stem = MAX_FILENAME_LENGTH - TABLE_EXTENSION.len();
    let stem: String = sanitized.chars().take(max_stem).collect();
    Ok(format!("{stem}{TABLE_EXTENSION}"))
}

/// Numbered variant of an export file name, `a_b.tsv` becoming `a_b.2.tsv`,
/// still within [`MAX_FILENAME_LENGTH`].
#[must_use]
pub fn numbered_table_filename(name: &str, number: usize) -> String {
    let stem = name.strip_suffix(TABLE_EXTENSION).unwrap_or(name);
    let suffix = format!(".{number}{TABLE_EXTENSION}");
    let max_stem = MAX_FILENAME_LENGTH.saturating_sub(suffix.len());
    let stem: String = stem.chars().take(max_stem).collect();
    format!("{stem}{suffix}")
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_hit_limit() {
        assert!(check_hit_limit(0).is_none());
        assert!(check_hit_limit(MAX_HIT_ROWS - 1).is_none());
        assert!(check_hit_limit(MAX_HIT_ROWS).is_some());
    }

    #[test]
    fn test_validate_mismatch_tolerance() {
        assert_eq!(validate_mismatch_tolerance(0), Ok(0));
        assert_eq!(validate_mismatch_tolerance(5), Ok(5));
        assert_eq!(
            validate_mismatch_tolerance(6),
            Err(ValidationError::MismatchOutOfRange(6))
        );
    }

    #[test]
    fn test_query_table_filename_sanitizes() {
        assert_eq!(
            query_table_filename("NC_001416.1").unwrap(),
            "NC_001416.1.tsv"
        );
        assert_eq!(
            query_table_filename("gi|9626243|ref|NC_001416.1|").unwrap(),
            "gi_9626243_ref_NC_001416.1_.tsv"
        );
        assert_eq!(
            query_table_filename("../../etc/passwd").unwrap(),
            "_.._etc_passwd.tsv"
        );
    }

    #[test]
    fn test_query_table_filename_rejects_unusable_ids() {
        assert_eq!(
            query_table_filename("   "),
            Err(ValidationError::EmptyFilename)
        );
        assert!(matches!(
            query_table_filename("///"),
            Err(ValidationError::InvalidFilename(_))
        ));
        assert!(matches!(
            query_table_filename(".."),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_query_table_filename_truncates() {
        let long_id = "a".repeat(1000);
        let name = query_table_filename(&long_id).unwrap();
        assert_eq!(name.len(), MAX_FILENAME_LENGTH);
        assert!(name.ends_with(".tsv"));
    }

    #[test]
    fn test_numbered_table_filename() {
        assert_eq!(numbered_table_filename("a_b.tsv", 2), "a_b.2.tsv");
        assert_eq!(numbered_table_filename("NC_001416.1.tsv", 3), "NC_001416.1.3.tsv");

        let long = query_table_filename(&"a".repeat(1000)).unwrap();
        let numbered = numbered_table_filename(&long, 12);
        assert_eq!(numbered.len(), MAX_FILENAME_LENGTH);
        assert!(numbered.ends_with("a.12.tsv"));
    }

    #[test]
    fn test_is_gzipped() {
        assert!(is_gzipped(Path::new("hits.tsv.gz")));
        assert!(is_gzipped(Path::new("phages.FA.GZ")));
        assert!(!is_gzipped(Path::new("hits.tsv")));
    }
}
