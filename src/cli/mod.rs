//! Command-line interface for crispr-host-id.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **identify**: Predict the bacterial host of phage genomes
//! - **catalog**: Inspect or export a spacer metadata catalog
//!
//! ## Usage
//!
//! ```text
//! # Align phages with BLAST and resolve hosts
//! crispr-host-id identify --input phages.fasta --catalog CrisprOpenDB.sqlite
//!
//! # Resolve hosts from an existing tabular alignment
//! crispr-host-id identify --hits phages.m8 --catalog spacers.tsv --mismatch 2
//!
//! # Full report per query
//! crispr-host-id identify --input phages.fasta --catalog CrisprOpenDB.sqlite --report
//!
//! # JSON output for scripting
//! crispr-host-id identify --hits phages.m8 --catalog spacers.tsv --format json
//! ```

use clap::{Parser, Subcommand};

pub mod catalog;
pub mod identify;

#[derive(Parser)]
#[command(name = "crispr-host-id")]
#[command(version)]
#[command(about = "Predict phage hosts from CRISPR spacer matches")]
#[command(
    long_about = "crispr-host-id predicts the bacterial host of a phage from the CRISPR spacers that match its genome.\n\nHits are filtered on gaps and mismatches, then resolved through four criteria:\n1. A single matching genus\n2. The genus hitting the most distinct positions on the phage genome\n3. The genus owning the spacer closest to the 5' end of its CRISPR array\n4. The family or order shared by the remaining candidates"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the host of each phage genome
    Identify(identify::IdentifyArgs),

    /// Inspect the spacer metadata catalog
    Catalog(catalog::CatalogArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
