//! Spacer metadata catalogs.
//!
//! Host resolution needs, for every matched spacer, the organism carrying it,
//! that organism's taxonomy and the spacer's place in its CRISPR array. The
//! metadata can come from:
//!
//! - **SQLite**: a spacer database in the CrisprOpenDB layout ([`sqlite::SqliteSpacerStore`])
//! - **TSV/CSV**: a flat metadata table ([`crate::parsing::spacers`])
//! - **JSON**: a catalog exported with `catalog export` ([`store::SpacerCatalog`])
//!
//! Every source implements [`MetadataSource`]. Resolution only ever sees the
//! in-memory [`store::SpacerCatalog`] fetched for the spacer ids that were hit,
//! which is shared read-only between queries.
//!
//! ## Example
//!
//! ```rust,no_run
//! use crispr_host_id::catalog::{open_source, MetadataSource};
//! use std::path::Path;
//!
//! let source = open_source(Path::new("CrisprOpenDB.sqlite")).unwrap();
//! let catalog = source.fetch(&["NC_002695_2_3".to_string()]).unwrap();
//! println!("{} spacer(s) resolved", catalog.len());
//! ```

use std::path::Path;

use thiserror::Error;

pub mod sqlite;
pub mod store;

use sqlite::SqliteSpacerStore;
use store::SpacerCatalog;

/// Number of spacer ids bound per `IN (...)` lookup; stays below SQLite's
/// historical limit of 999 host parameters.
pub const LOOKUP_CHUNK_SIZE: usize = 900;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to parse spacer table: {0}")]
    TableError(#[from] crate::parsing::ParseError),

    #[error("Spacer database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Read-only access to spacer metadata.
///
/// Implementations must be complete: a lookup either returns metadata for
/// every known id in `spacer_ids` or fails. Ids absent from the source are
/// simply missing from the returned catalog.
pub trait MetadataSource: Send + Sync {
    /// Fetch metadata for the given spacer ids
    ///
    /// # Errors
    ///
    /// Returns a `CatalogError` if the backend cannot be queried.
    fn fetch(&self, spacer_ids: &[String]) -> Result<SpacerCatalog, CatalogError>;

    /// Every spacer of the source, for `catalog export`
    ///
    /// # Errors
    ///
    /// Returns a `CatalogError` if the backend cannot be queried.
    fn load_all(&self) -> Result<SpacerCatalog, CatalogError>;

    /// Summary counts for `catalog stats`
    ///
    /// # Errors
    ///
    /// Returns a `CatalogError` if the backend cannot be queried.
    fn stats(&self) -> Result<CatalogStats, CatalogError>;
}

/// Summary counts of a spacer catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CatalogStats {
    pub spacers: usize,
    pub distinct_sequences: usize,
    pub organisms: usize,
}

/// Open a metadata source, choosing the backend from the file extension:
/// `.sqlite`/`.sqlite3`/`.db` for SQLite, `.json` for an exported catalog,
/// anything else as a TSV/CSV metadata table.
///
/// # Errors
///
/// Returns a `CatalogError` if the file cannot be opened or parsed.
pub fn open_source(path: &Path) -> Result<Box<dyn MetadataSource>, CatalogError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match ext.as_deref() {
        Some("sqlite" | "sqlite3" | "db") => Ok(Box::new(SqliteSpacerStore::open(path)?)),
        Some("json") => Ok(Box::new(SpacerCatalog::load_from_file(path)?)),
        _ => Ok(Box::new(SpacerCatalog::load_from_table(path)?)),
    }
}
