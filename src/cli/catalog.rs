use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};

use crate::catalog::{open_source, MetadataSource};
use crate::cli::identify::DEFAULT_SPACER_DATABASE;
use crate::cli::OutputFormat;
use crate::core::spacer::SpacerMetadata;

#[derive(Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Count spacers, distinct spacer sequences and organisms
    Stats {
        /// Spacer metadata: SQLite database, TSV/CSV table or JSON catalog
        #[arg(long, default_value = DEFAULT_SPACER_DATABASE)]
        catalog: PathBuf,
    },

    /// Show the metadata of one or more spacers
    Show {
        /// Spacer ID(s)
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,

        /// Spacer metadata: SQLite database, TSV/CSV table or JSON catalog
        #[arg(long, default_value = DEFAULT_SPACER_DATABASE)]
        catalog: PathBuf,
    },

    /// Export the catalog to a JSON file
    Export {
        /// Output file path
        #[arg(required = true)]
        output: PathBuf,

        /// Spacer metadata: SQLite database, TSV/CSV table or JSON catalog
        #[arg(long, default_value = DEFAULT_SPACER_DATABASE)]
        catalog: PathBuf,
    },
}

/// Execute catalog subcommand
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened or queried, or the
/// export cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CatalogArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    match args.command {
        CatalogCommands::Stats { catalog } => {
            let source = open(&catalog)?;
            run_stats(source.as_ref(), format)
        }
        CatalogCommands::Show { ids, catalog } => {
            let source = open(&catalog)?;
            run_show(source.as_ref(), &ids, format)
        }
        CatalogCommands::Export { output, catalog } => {
            let source = open(&catalog)?;
            run_export(source.as_ref(), &output, verbose)
        }
    }
}

fn open(path: &std::path::Path) -> anyhow::Result<Box<dyn MetadataSource>> {
    open_source(path).with_context(|| format!("Failed to open spacer catalog {}", path.display()))
}

fn run_stats(source: &dyn MetadataSource, format: OutputFormat) -> anyhow::Result<()> {
    let stats = source.stats()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Tsv => {
            println!("spacers\tdistinct_sequences\torganisms");
            println!(
                "{}\t{}\t{}",
                stats.spacers, stats.distinct_sequences, stats.organisms
            );
        }
        OutputFormat::Text => {
            println!("Spacers:            {}", stats.spacers);
            println!("Distinct sequences: {}", stats.distinct_sequences);
            println!("Organisms:          {}", stats.organisms);
        }
    }
    Ok(())
}

fn run_show(source: &dyn MetadataSource, ids: &[String], format: OutputFormat) -> anyhow::Result<()> {
    let catalog = source.fetch(ids)?;

    let missing: Vec<&str> = ids
        .iter()
        .filter(|id| catalog.get(id).is_none())
        .map(String::as_str)
        .collect();
    if catalog.is_empty() {
        anyhow::bail!("Spacer(s) not found: {}", missing.join(", "));
    }
    for id in &missing {
        eprintln!("Warning: spacer {id} not found");
    }

    let found: Vec<&SpacerMetadata> = ids.iter().filter_map(|id| catalog.get(id)).collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&found)?),
        OutputFormat::Tsv => {
            println!("spacer_id\torganism_id\torganism_name\tspecies\tgenus\tfamily\torder\tspacer_length\tarray_spacer_count\tposition_in_locus\tspacer_sequence");
            for s in &found {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    s.spacer_id,
                    s.organism_id,
                    s.organism_name,
                    s.species,
                    s.genus,
                    s.family,
                    s.order,
                    s.spacer_length,
                    s.array_spacer_count,
                    s.position_in_locus,
                    s.spacer_sequence
                );
            }
        }
        OutputFormat::Text => {
            for (i, s) in found.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_spacer_details(s);
            }
        }
    }
    Ok(())
}

fn print_spacer_details(spacer: &SpacerMetadata) {
    println!("Spacer: {}", spacer.spacer_id);
    println!("  Organism: {} ({})", spacer.organism_name, spacer.organism_id);
    println!("  Species:  {}", spacer.species);
    println!(
        "  Lineage:  {} > {} > {}",
        spacer.order, spacer.family, spacer.genus
    );
    println!("  Length:   {} bp", spacer.spacer_length);
    println!(
        "  Array:    position {} of {} (5' relative position {:.3})",
        spacer.position_in_locus,
        spacer.array_spacer_count,
        spacer.five_prime_relative_position()
    );
    if !spacer.spacer_sequence.is_empty() {
        println!("  Sequence: {}", spacer.spacer_sequence);
    }
}

fn run_export(source: &dyn MetadataSource, output: &std::path::Path, verbose: bool) -> anyhow::Result<()> {
    let catalog = source.load_all()?;
    let json = catalog.to_json()?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if verbose {
        eprintln!("Exported {} spacer(s) to {}", catalog.len(), output.display());
    }
    Ok(())
}
