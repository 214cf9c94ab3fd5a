use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

use super::{CatalogError, CatalogStats, MetadataSource};
use crate::core::spacer::SpacerMetadata;
use crate::parsing::spacers::parse_spacer_file;

/// Catalog version for compatibility checking
pub const CATALOG_VERSION: &str = "1.0.0";

/// Serializable catalog format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogData {
    pub version: String,
    pub created_at: String,
    pub spacers: Vec<SpacerMetadata>,
}

/// In-memory spacer catalog indexed by spacer id
#[derive(Debug, Clone, Default)]
pub struct SpacerCatalog {
    /// All known spacers
    pub spacers: Vec<SpacerMetadata>,

    /// Index: spacer ID -> index in spacers vec
    id_to_index: HashMap<String, usize>,
}

impl SpacerCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load catalog from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReadError` or `CatalogError::ParseError`.
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load catalog from a TSV/CSV metadata table
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::TableError` if the table cannot be parsed.
    pub fn load_from_table(path: &Path) -> Result<Self, CatalogError> {
        let spacers = parse_spacer_file(path)?;
        debug!("Loaded {} spacers from {}", spacers.len(), path.display());
        Ok(spacers.into_iter().collect())
    }

    /// Parse catalog from JSON string
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` for invalid JSON.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != CATALOG_VERSION {
            warn!(
                "Catalog version mismatch (expected {}, found {})",
                CATALOG_VERSION, data.version
            );
        }

        Ok(data.spacers.into_iter().collect())
    }

    /// Add a spacer to the catalog. A spacer id seen before is replaced.
    pub fn add_spacer(&mut self, spacer: SpacerMetadata) {
        if let Some(&index) = self.id_to_index.get(&spacer.spacer_id) {
            warn!("Duplicate spacer id {}; keeping the last entry", spacer.spacer_id);
            self.spacers[index] = spacer;
            return;
        }

        self.id_to_index
            .insert(spacer.spacer_id.clone(), self.spacers.len());
        self.spacers.push(spacer);
    }

    /// Get a spacer by ID
    pub fn get(&self, spacer_id: &str) -> Option<&SpacerMetadata> {
        self.id_to_index
            .get(spacer_id)
            .map(|&idx| &self.spacers[idx])
    }

    /// Export catalog to JSON
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` if serialization fails.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let data = CatalogData {
            version: CATALOG_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            spacers: self.spacers.clone(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Number of spacers in catalog
    pub fn len(&self) -> usize {
        self.spacers.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.spacers.is_empty()
    }
}

impl FromIterator<SpacerMetadata> for SpacerCatalog {
    fn from_iter<I: IntoIterator<Item = SpacerMetadata>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for spacer in iter {
            catalog.add_spacer(spacer);
        }
        catalog
    }
}

impl MetadataSource for SpacerCatalog {
    fn fetch(&self, spacer_ids: &[String]) -> Result<SpacerCatalog, CatalogError> {
        let mut seen: HashSet<&str> = HashSet::new();
        Ok(spacer_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.get(id))
            .cloned()
            .collect())
    }

    fn load_all(&self) -> Result<SpacerCatalog, CatalogError> {
        Ok(self.clone())
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let distinct: HashSet<&str> = self
            .spacers
            .iter()
            .map(|s| s.spacer_sequence.as_str())
            .collect();
        let organisms: HashSet<&str> = self
            .spacers
            .iter()
            .map(|s| s.organism_id.as_str())
            .collect();
        Ok(CatalogStats {
            spacers: self.spacers.len(),
            distinct_sequences: distinct.len(),
            organisms: organisms.len(),
        })
    }
}
