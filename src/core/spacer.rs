use serde::{Deserialize, Serialize};

use crate::core::types::UNKNOWN_TAXON;

fn unknown() -> String {
    UNKNOWN_TAXON.to_string()
}

/// Catalog metadata for one CRISPR spacer and the organism carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacerMetadata {
    pub spacer_id: String,

    /// Accession of the bacterial genome the spacer was found in
    #[serde(default)]
    pub organism_id: String,

    #[serde(default = "unknown")]
    pub organism_name: String,
    #[serde(default = "unknown")]
    pub species: String,
    #[serde(default = "unknown")]
    pub genus: String,
    #[serde(default = "unknown")]
    pub family: String,
    #[serde(default = "unknown")]
    pub order: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub spacer_sequence: String,

    pub spacer_length: u32,

    /// Total number of spacers in the CRISPR array (>= 1)
    pub array_spacer_count: u32,

    /// 1-based position of the spacer in its array, 5' to 3'
    pub position_in_locus: u32,
}

impl SpacerMetadata {
    /// Create metadata for a single-spacer array with unknown taxonomy
    pub fn new(spacer_id: impl Into<String>, spacer_length: u32) -> Self {
        Self {
            spacer_id: spacer_id.into(),
            organism_id: String::new(),
            organism_name: unknown(),
            species: unknown(),
            genus: unknown(),
            family: unknown(),
            order: unknown(),
            spacer_sequence: String::new(),
            spacer_length,
            array_spacer_count: 1,
            position_in_locus: 1,
        }
    }

    #[must_use]
    pub fn with_organism(mut self, organism_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.organism_id = organism_id.into();
        self.organism_name = name.into();
        self
    }

    #[must_use]
    pub fn with_taxonomy(
        mut self,
        genus: impl Into<String>,
        family: impl Into<String>,
        order: impl Into<String>,
    ) -> Self {
        self.genus = genus.into();
        self.family = family.into();
        self.order = order.into();
        self
    }

    #[must_use]
    pub fn with_array_position(mut self, position_in_locus: u32, array_spacer_count: u32) -> Self {
        self.position_in_locus = position_in_locus;
        self.array_spacer_count = array_spacer_count;
        self
    }

    /// Whether the spacer's position lies inside a non-empty array
    pub fn has_valid_position(&self) -> bool {
        self.position_in_locus >= 1 && self.position_in_locus <= self.array_spacer_count
    }

    /// Relative position of the spacer in its array: 0.0 for the 5'-most
    /// spacer, 1.0 for the 3'-most.
    ///
    /// A single-spacer array is both first and last; its spacer is placed at 0.0.
    pub fn five_prime_relative_position(&self) -> f64 {
        if self.array_spacer_count <= 1 {
            return 0.0;
        }
        let offset = self.position_in_locus.saturating_sub(1);
        f64::from(offset) / f64::from(self.array_spacer_count - 1)
    }
}
