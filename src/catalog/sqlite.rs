//! Spacer metadata stored in SQLite, in the CrisprOpenDB layout:
//!
//! - `ORGANISM (GENEBANK_ID, ORGANISM_NAME, SPECIES, GENUS, FAMILY, TORDER)`
//! - `SPACER_TABLE (SPACER_ID, SPACER, START, END, SPACER_LENGTH, STRAND,
//!   POSITION_INSIDE_LOCUS, NUMERO_LOCUS, GENEBANK_ID)`
//! - `SPACER_ARRAY_LENGTH (GENEBANK_ID, NUMERO_LOCUS, COUNT_SPACER)`
//!
//! The database is opened read-only. Taxonomy columns left NULL by an
//! incomplete enrichment read as `"Unknown"`. A row with a NULL length,
//! array size or position, or a position outside its array, is skipped so
//! its hits count as missing metadata.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use tracing::{debug, warn};

use super::store::SpacerCatalog;
use super::{CatalogError, CatalogStats, MetadataSource, LOOKUP_CHUNK_SIZE};
use crate::core::spacer::SpacerMetadata;
use crate::core::types::UNKNOWN_TAXON;

const SPACER_SELECT: &str = "select ST.SPACER_ID, ST.GENEBANK_ID, ORG.ORGANISM_NAME, \
     ORG.SPECIES, ORG.GENUS, ORG.FAMILY, ORG.TORDER, ST.SPACER, ST.SPACER_LENGTH, \
     SAL.COUNT_SPACER, ST.POSITION_INSIDE_LOCUS \
     from ORGANISM ORG, SPACER_TABLE ST, SPACER_ARRAY_LENGTH SAL \
     where ST.GENEBANK_ID = ORG.GENEBANK_ID \
     and ST.GENEBANK_ID = SAL.GENEBANK_ID \
     and ST.NUMERO_LOCUS = SAL.NUMERO_LOCUS";

/// Read-only handle on a spacer database
pub struct SqliteSpacerStore {
    connection: Mutex<Connection>,
    chunk_size: usize,
}

impl SqliteSpacerStore {
    /// Open a spacer database read-only
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReadError` if the file does not exist, or
    /// `CatalogError::Database` if SQLite cannot open it.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("spacer database not found: {}", path.display()),
            )));
        }

        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("Opened spacer database {}", path.display());

        Ok(Self::from_connection(connection))
    }

    /// Wrap an already open connection
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Mutex::new(connection),
            chunk_size: LOOKUP_CHUNK_SIZE,
        }
    }

    /// Override the number of ids bound per lookup query
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn count(connection: &Connection, sql: &str) -> Result<usize, CatalogError> {
        let count: i64 = connection.query_row(sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn taxon(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| UNKNOWN_TAXON.to_string()))
}

fn spacer_from_row(row: &Row<'_>) -> rusqlite::Result<Option<SpacerMetadata>> {
    let spacer_id: String = row.get(0)?;
    let (Some(spacer_length), Some(array_spacer_count), Some(position_in_locus)) = (
        row.get::<_, Option<u32>>(8)?,
        row.get::<_, Option<u32>>(9)?,
        row.get::<_, Option<u32>>(10)?,
    ) else {
        debug!("Skipping spacer {spacer_id}: length or array position is NULL");
        return Ok(None);
    };

    let spacer = SpacerMetadata {
        spacer_id,
        organism_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        organism_name: taxon(row, 2)?,
        species: taxon(row, 3)?,
        genus: taxon(row, 4)?,
        family: taxon(row, 5)?,
        order: taxon(row, 6)?,
        spacer_sequence: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        spacer_length,
        array_spacer_count,
        position_in_locus,
    };

    if !spacer.has_valid_position() {
        warn!(
            "Skipping spacer {}: position {} is outside an array of {} spacer(s)",
            spacer.spacer_id, spacer.position_in_locus, spacer.array_spacer_count
        );
        return Ok(None);
    }
    Ok(Some(spacer))
}

impl MetadataSource for SqliteSpacerStore {
    fn fetch(&self, spacer_ids: &[String]) -> Result<SpacerCatalog, CatalogError> {
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut catalog = SpacerCatalog::new();

        // A failed chunk aborts the whole lookup; a partial catalog would
        // silently turn hits into "missing metadata".
        for chunk in spacer_ids.chunks(self.chunk_size) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!("{SPACER_SELECT} and ST.SPACER_ID in ({placeholders})");
            let mut statement = connection.prepare(&sql)?;
            let rows = statement.query_map(params_from_iter(chunk.iter()), spacer_from_row)?;
            for row in rows {
                let Some(spacer) = row? else { continue };
                if catalog.get(&spacer.spacer_id).is_none() {
                    catalog.add_spacer(spacer);
                }
            }
        }

        debug!(
            "Fetched metadata for {}/{} spacer ids in chunks of {}",
            catalog.len(),
            spacer_ids.len(),
            self.chunk_size
        );
        Ok(catalog)
    }

    fn load_all(&self) -> Result<SpacerCatalog, CatalogError> {
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut statement = connection.prepare(&format!("{SPACER_SELECT} order by ST.SPACER_ID"))?;
        let spacers = statement
            .query_map([], spacer_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let catalog: SpacerCatalog = spacers.into_iter().flatten().collect();
        debug!("Loaded {} spacers from the spacer database", catalog.len());
        Ok(catalog)
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(CatalogStats {
            spacers: Self::count(&connection, "select count(SPACER_ID) from SPACER_TABLE")?,
            distinct_sequences: Self::count(
                &connection,
                "select count(distinct SPACER) from SPACER_TABLE",
            )?,
            organisms: Self::count(&connection, "select count(GENEBANK_ID) from ORGANISM")?,
        })
    }
}
