use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use std::collections::HashSet;

use anyhow::Context;
use clap::{ArgGroup, Args};
use flate2::read::GzDecoder;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::aligner::{run_alignment, AlignerConfig, AlignerKind};
use crate::catalog::open_source;
use crate::cli::OutputFormat;
use crate::core::hit::{group_by_query, AlignmentHit, QueryHits};
use crate::core::record::HitRecord;
use crate::core::types::TaxonRank;
use crate::matching::batch::fetch_catalog;
use crate::matching::candidates::DEFAULT_MISMATCH_TOLERANCE;
use crate::matching::report::{Observation, StageTrace};
use crate::matching::{BatchResolver, BatchSummary, FilterConfig, QueryOutcome};
use crate::parsing;
use crate::utils::validation::{
    is_gzipped, numbered_table_filename, query_table_filename, validate_mismatch_tolerance,
};

/// Default spacer database location
pub const DEFAULT_SPACER_DATABASE: &str = "CrisprOpenDB/SpacersDB/CrisprOpenDB.sqlite";

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "hits"])))]
pub struct IdentifyArgs {
    /// Phage genomes to align (FASTA, optionally gzipped)
    /// Use '-' for stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Precomputed alignment table (BLAST -outfmt 6 or FASTA36 -m 8)
    /// Use '-' for stdin
    #[arg(long)]
    pub hits: Option<PathBuf>,

    /// Spacer metadata: SQLite database, TSV/CSV table or JSON catalog
    #[arg(short, long, default_value = DEFAULT_SPACER_DATABASE)]
    pub catalog: PathBuf,

    /// Number of mismatches tolerated between spacer and phage (0-5)
    #[arg(short, long, default_value_t = DEFAULT_MISMATCH_TOLERANCE, value_parser = parse_mismatch)]
    pub mismatch: u32,

    /// Alignment tool
    #[arg(short, long, value_enum, default_value = "blast")]
    pub aligner: AlignerKind,

    /// BLAST database prefix or FASTA36 spacer library
    /// (defaults to the CrisprOpenDB layout for the chosen aligner)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Number of threads for the aligner and for host resolution
    #[arg(short, long, default_value = "1")]
    pub threads: usize,

    /// Print the step-by-step resolution report of every query
    #[arg(short, long)]
    pub report: bool,

    /// Write each query's joined table (before gap/mismatch filtering) to this directory
    #[arg(long)]
    pub table: Option<PathBuf>,

    /// Keep spacers whose host genus is unknown
    #[arg(long)]
    pub unknown: bool,
}

fn parse_mismatch(value: &str) -> Result<u32, String> {
    let tolerance: u32 = value
        .parse()
        .map_err(|e| format!("'{value}' is not a mismatch count: {e}"))?;
    validate_mismatch_tolerance(tolerance).map_err(|e| e.to_string())
}

/// Execute identify subcommand
///
/// # Errors
///
/// Returns an error if the alignment or catalog cannot be read, the aligner
/// fails, or the output cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: IdentifyArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    if args.unknown {
        eprintln!(
            "Warning: keeping spacers of unknown genus. Host calls may be less specific \
             and an unknown genus can win a criterion."
        );
    }

    let (hits, query_ids) = collect_hits(&args)?;
    if verbose {
        eprintln!("Parsed {} alignment hit(s)", hits.len());
    }

    if hits.is_empty() {
        eprintln!("No hits found.");
        return Ok(());
    }

    let queries = group_by_query(hits);

    let source = open_source(&args.catalog)
        .with_context(|| format!("Failed to open spacer catalog {}", args.catalog.display()))?;
    let catalog = fetch_catalog(source.as_ref(), &queries)?;
    if verbose {
        eprintln!(
            "Fetched metadata for {} spacer(s) across {} quer(ies)",
            catalog.len(),
            queries.len()
        );
    }

    let config = FilterConfig {
        mismatch_tolerance: args.mismatch,
        keep_unknown_genus: args.unknown,
    };
    let resolver = BatchResolver::new(&catalog, config).with_threads(args.threads)?;

    if let Some(dir) = &args.table {
        export_tables(&resolver, &queries, dir)?;
    }

    let summary = resolver.resolve_all(&queries, query_ids.as_deref());

    match format {
        OutputFormat::Text => print_text_results(&summary, args.report, verbose),
        OutputFormat::Json => print_json_results(&summary)?,
        OutputFormat::Tsv => print_tsv_results(&summary),
    }

    Ok(())
}

/// Hits of the run, plus the query ids of the input FASTA when aligning
fn collect_hits(args: &IdentifyArgs) -> anyhow::Result<(Vec<AlignmentHit>, Option<Vec<String>>)> {
    if let Some(path) = &args.hits {
        let hits = if is_stdin(path) {
            parsing::tabular::parse_hit_bytes(io::stdin().lock())?
        } else {
            parsing::tabular::parse_hit_file(path)
                .with_context(|| format!("Failed to read alignment table {}", path.display()))?
        };
        return Ok((hits, None));
    }

    let input = args
        .input
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Either --input or --hits is required"))?;

    // Aligners need a plain, seekable file
    let spooled = if is_stdin(input) || is_gzipped(input) {
        Some(spool_input(input)?)
    } else {
        None
    };
    let fasta = spooled.as_ref().map_or(input.as_path(), NamedTempFile::path);

    let query_ids = parsing::fasta::read_query_ids(fasta)
        .with_context(|| format!("Failed to read query FASTA {}", input.display()))?;

    let config = AlignerConfig::new(args.aligner, args.database.clone(), args.threads);
    let hits = run_alignment(&config, fasta)?;
    Ok((hits, Some(query_ids)))
}

fn is_stdin(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

/// Copy stdin or a gzipped FASTA to a temporary plain file
fn spool_input(input: &Path) -> anyhow::Result<NamedTempFile> {
    let mut spool = tempfile::Builder::new()
        .prefix("crispr-host-id-")
        .suffix(".fasta")
        .tempfile()?;

    if is_stdin(input) {
        io::copy(&mut io::stdin().lock(), &mut spool)?;
    } else {
        let file = File::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;
        io::copy(&mut GzDecoder::new(file), &mut spool)?;
    }
    spool.flush()?;
    Ok(spool)
}

fn export_tables(resolver: &BatchResolver<'_>, queries: &[QueryHits], dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create table directory {}", dir.display()))?;

    let ids: Vec<&str> = queries.iter().map(|q| q.query_id.as_str()).collect();
    for (query, name) in queries.iter().zip(table_filenames(&ids)) {
        let path = dir.join(name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_joined_table(&resolver.joined_table(query), &mut writer)?;
        writer.flush()?;
    }
    Ok(())
}

/// One distinct export file name per query id, in order.
///
/// Ids that sanitize to a name already taken get a numbered name. Ids with
/// no usable characters fall back to `query_<n>.tsv`, `n` being the 1-based
/// position of the query.
fn table_filenames(query_ids: &[&str]) -> Vec<String> {
    // Compared case-insensitively for case-folding file systems
    let mut used = HashSet::new();
    let mut names = Vec::with_capacity(query_ids.len());

    for (index, query_id) in query_ids.iter().enumerate() {
        let base = query_table_filename(query_id).unwrap_or_else(|e| {
            warn!("{e}; exporting its table as query_{}.tsv", index + 1);
            format!("query_{}.tsv", index + 1)
        });

        let mut name = base.clone();
        let mut number = 2;
        while !used.insert(name.to_lowercase()) {
            name = numbered_table_filename(&base, number);
            number += 1;
        }
        names.push(name);
    }
    names
}

/// Write joined records as TSV, one row per hit with metadata
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_joined_table<W: Write>(records: &[HitRecord], writer: &mut W) -> io::Result<()> {
    writeln!(
        writer,
        "query_id\tspacer_id\tpercent_identity\talignment_length\tmismatch_count\tgap_count\tquery_start\tquery_end\tsubject_start\tsubject_end\te_value\tscore\torganism_id\torganism_name\tspecies\tgenus\tfamily\torder\tspacer_length\tarray_spacer_count\tposition_in_locus\ttrue_mismatch"
    )?;
    for r in records {
        let (hit, spacer) = (&r.hit, &r.spacer);
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:e}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            hit.query_id,
            hit.spacer_id,
            hit.percent_identity,
            hit.alignment_length,
            hit.mismatch_count,
            hit.gap_count,
            hit.query_start,
            hit.query_end,
            hit.subject_start,
            hit.subject_end,
            hit.e_value,
            hit.score,
            spacer.organism_id,
            spacer.organism_name,
            spacer.species,
            spacer.genus,
            spacer.family,
            spacer.order,
            spacer.spacer_length,
            spacer.array_spacer_count,
            spacer.position_in_locus,
            r.true_mismatch(),
        )?;
    }
    Ok(())
}

fn print_text_results(summary: &BatchSummary, report: bool, verbose: bool) {
    for outcome in &summary.outcomes {
        if report {
            println!("\n{}", render_report(outcome));
        }
        println!("{}", describe_outcome(outcome));
    }

    if verbose {
        eprintln!(
            "\n{} resolved, {} without candidates, {} without hits",
            summary.resolved(),
            summary.no_candidates(),
            summary.no_hits()
        );
    }
}

/// One-line summary of an outcome
pub fn describe_outcome(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Resolved(result) => format!(
            "{}\t{}\t{} (confidence level {})",
            result.query_id(),
            result.host_label(),
            result.rank(),
            result.confidence_level()
        ),
        QueryOutcome::NoCandidates {
            query_id,
            mismatch_tolerance,
            ..
        } => format!("{query_id}\tNo candidates within {mismatch_tolerance} mismatch(es)"),
        QueryOutcome::NoHits { query_id } => format!("{query_id}\tNo hits found"),
    }
}

/// Step-by-step explanation of how a query was resolved
pub fn render_report(outcome: &QueryOutcome) -> String {
    let mut out = String::new();
    let rule = "=".repeat(20);
    let _ = writeln!(out, "{rule}\nQuery: {}\n{rule}", outcome.query_id());

    let result = match outcome {
        QueryOutcome::Resolved(result) => result,
        QueryOutcome::NoCandidates {
            mismatch_tolerance, ..
        } => {
            let _ = writeln!(
                out,
                "Empty result table. Found no match between query and spacer database that tolerates {mismatch_tolerance} mismatch(es)."
            );
            return out;
        }
        QueryOutcome::NoHits { .. } => {
            let _ = writeln!(out, "The aligner reported no hit for this query.");
            return out;
        }
    };

    let report = result.report();
    let _ = writeln!(out, "{} candidate spacer hit(s)", report.candidate_count());

    for stage in report.stages() {
        let _ = writeln!(
            out,
            "\n**Criterion {}: {}**",
            stage.criterion.level(),
            stage.criterion.description()
        );
        render_observation(&mut out, stage);

        match &stage.resolved {
            Some(call) => {
                match call.rank {
                    TaxonRank::Family => {
                        let _ = writeln!(out, "Family is common to all remaining potential hosts.");
                    }
                    TaxonRank::Order => {
                        let _ = writeln!(out, "Order is common to all remaining potential hosts.");
                    }
                    TaxonRank::Unresolved => {
                        let _ = writeln!(out, "Unable to find last common ancestor.");
                    }
                    TaxonRank::Genus => {}
                }
                if call.rank != TaxonRank::Unresolved {
                    let _ = writeln!(out, "Host is {}. Found using {}", call.label, stage.criterion);
                }
                let _ = writeln!(out, "Spacer(s) on which prediction is based:");
                for spacer in report.supporting() {
                    let name = if spacer.spacer_sequence.is_empty() {
                        &spacer.spacer_id
                    } else {
                        &spacer.spacer_sequence
                    };
                    let _ = writeln!(
                        out,
                        "{name}; Organism: {}; Start position on phage genome: {}; End position on phage genome: {}",
                        spacer.organism_name, spacer.query_start, spacer.query_end
                    );
                }
            }
            None => render_narrowing(&mut out, stage),
        }
    }
    out
}

fn render_observation(out: &mut String, stage: &StageTrace) {
    match &stage.observation {
        Observation::Genera { .. } => {}
        Observation::PositionVotes { votes } => {
            for vote in votes {
                let _ = writeln!(
                    out,
                    "Genus: {}; Different positions: {}",
                    vote.genus, vote.distinct_positions
                );
            }
        }
        Observation::RelativePositions { positions } => {
            let _ = writeln!(out, "5' relative positions of all remaining spacers:");
            for position in positions {
                let _ = writeln!(
                    out,
                    "{}; Genus: {}; 5' relative position: {}",
                    position.spacer_id, position.genus, position.value
                );
            }
        }
        Observation::Lineages { lineages } => {
            let _ = writeln!(out, "Remaining potential hosts:");
            for lineage in lineages {
                let _ = writeln!(
                    out,
                    "Genus: {}; Family: {}; Order: {}",
                    lineage.genus, lineage.family, lineage.order
                );
            }
        }
    }
}

fn render_narrowing(out: &mut String, stage: &StageTrace) {
    let genera = stage.retained_genera.join(", ");
    let _ = match &stage.observation {
        Observation::Genera { .. } => writeln!(out, "Multiple possible genera: {genera}"),
        Observation::PositionVotes { .. } => writeln!(out, "Genera to keep: {genera}"),
        Observation::RelativePositions { .. } => writeln!(
            out,
            "Potential hosts with the same relative position (most in 5'): {genera}"
        ),
        Observation::Lineages { .. } => Ok(()),
    };
}

fn print_json_results(summary: &BatchSummary) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "summary": {
            "queries": summary.outcomes.len(),
            "resolved": summary.resolved(),
            "no_candidates": summary.no_candidates(),
            "no_hits": summary.no_hits(),
        },
        "outcomes": summary.outcomes,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_results(summary: &BatchSummary) {
    println!("query_id\toutcome\thost\trank\tcriterion\tconfidence_level\tcandidates\tsupporting_spacers");
    for outcome in &summary.outcomes {
        match outcome {
            QueryOutcome::Resolved(result) => {
                let supporting: Vec<&str> = result
                    .report()
                    .supporting()
                    .iter()
                    .map(|s| s.spacer_id.as_str())
                    .collect();
                println!(
                    "{}\tresolved\t{}\t{}\t{}\t{}\t{}\t{}",
                    result.query_id(),
                    result.host_label(),
                    result.rank(),
                    result.criterion().level(),
                    result.confidence_level(),
                    result.report().candidate_count(),
                    supporting.join(",")
                );
            }
            QueryOutcome::NoCandidates { query_id, .. } => {
                println!("{query_id}\tno_candidates\t\t\t\t\t0\t");
            }
            QueryOutcome::NoHits { query_id } => {
                println!("{query_id}\tno_hits\t\t\t\t\t0\t");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::store::SpacerCatalog;
    use crate::core::spacer::SpacerMetadata;

    fn summary() -> BatchSummary {
        let catalog: SpacerCatalog = vec![
            SpacerMetadata::new("a1", 30)
                .with_organism("G1", "Alpha one")
                .with_taxonomy("Alpha", "Fam", "Ord"),
            SpacerMetadata::new("a2", 30)
                .with_organism("G1", "Alpha one")
                .with_taxonomy("Alpha", "Fam", "Ord"),
            SpacerMetadata::new("b1", 30)
                .with_organism("G2", "Beta two")
                .with_taxonomy("Beta", "Fam", "Ord"),
        ]
        .into_iter()
        .collect();
        let queries = group_by_query(vec![
            AlignmentHit::new("phage1", "a1", 30, 10, 39),
            AlignmentHit::new("phage1", "a2", 30, 200, 229),
            AlignmentHit::new("phage1", "b1", 30, 400, 429),
            AlignmentHit::new("phage2", "b1", 20, 1, 20),
        ]);
        BatchResolver::new(&catalog, FilterConfig::default()).resolve_all(&queries, None)
    }

    #[test]
    fn test_parse_mismatch_range() {
        assert_eq!(parse_mismatch("0"), Ok(0));
        assert_eq!(parse_mismatch("5"), Ok(5));
        assert!(parse_mismatch("6").is_err());
        assert!(parse_mismatch("-1").is_err());
        assert!(parse_mismatch("two").is_err());
    }

    #[test]
    fn test_describe_outcome() {
        let summary = summary();
        assert_eq!(
            describe_outcome(&summary.outcomes[0]),
            "phage1\tAlpha\tgenus (confidence level 2)"
        );
        assert_eq!(
            describe_outcome(&summary.outcomes[1]),
            "phage2\tNo candidates within 1 mismatch(es)"
        );
        assert_eq!(
            describe_outcome(&QueryOutcome::NoHits {
                query_id: "phage3".to_string()
            }),
            "phage3\tNo hits found"
        );
    }

    #[test]
    fn test_table_filenames_are_distinct() {
        let names = table_filenames(&["a|b", "a/b", "|||", "A|B", "a_b", "lambda"]);
        assert_eq!(
            names,
            vec!["a_b.tsv", "a_b.2.tsv", "query_3.tsv", "A_B.3.tsv", "a_b.4.tsv", "lambda.tsv"]
        );
    }

    #[test]
    fn test_table_filenames_fallback_does_not_collide() {
        let names = table_filenames(&["query_2.tsv", "///"]);
        assert_eq!(names, vec!["query_2.tsv.tsv", "query_2.tsv"]);

        let names = table_filenames(&["query_2", "   "]);
        assert_eq!(names, vec!["query_2.tsv", "query_2.2.tsv"]);
    }

    #[test]
    fn test_render_report_vote() {
        let summary = summary();
        let report = render_report(&summary.outcomes[0]);

        assert!(report.contains("Query: phage1"));
        assert!(report.contains("Multiple possible genera: Alpha, Beta"));
        assert!(report.contains("Genus: Alpha; Different positions: 2"));
        assert!(report.contains("Host is Alpha. Found using criterion #2"));
        assert!(report.contains("a2; Organism: Alpha one; Start position on phage genome: 200"));
        assert!(!report.contains("Criterion 3"));
    }

    #[test]
    fn test_render_report_no_candidates() {
        let summary = summary();
        let report = render_report(&summary.outcomes[1]);
        assert!(report.contains("tolerates 1 mismatch(es)"));
    }

    #[test]
    fn test_write_joined_table() {
        let record = HitRecord::join(
            AlignmentHit::new("phage1", "a1", 28, 10, 37).with_mismatches(1),
            SpacerMetadata::new("a1", 30).with_taxonomy("Alpha", "Fam", "Ord"),
        );
        let mut buffer = Vec::new();
        write_joined_table(&[record], &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("query_id\tspacer_id"));
        assert!(lines[1].starts_with("phage1\ta1\t"));
        assert!(lines[1].ends_with("\t3"));
        assert_eq!(lines[0].split('\t').count(), lines[1].split('\t').count());
    }
}
