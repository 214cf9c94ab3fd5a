//! External alignment of phage genomes against the spacer database.
//!
//! Two aligners are supported, both producing 12-column tabular output:
//!
//! - **BLAST**: `blastn -task blastn -outfmt 6` against a formatted BLAST database
//! - **FASTA36**: `fasta36 -m 8` against a FASTA file of spacers

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::hit::AlignmentHit;
use crate::parsing::tabular::parse_hit_bytes;
use crate::parsing::ParseError;

/// Default BLAST database prefix
pub const DEFAULT_BLAST_DATABASE: &str = "CrisprOpenDB/SpacersDB/SpacersDB";

/// Default FASTA36 spacer library
pub const DEFAULT_FASTA_DATABASE: &str = "CrisprOpenDB/SpacersDB/SpacersDB.fasta";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignerKind {
    #[default]
    Blast,
    Fasta36,
}

impl AlignerKind {
    /// Executable invoked for this aligner
    pub fn program(self) -> &'static str {
        match self {
            Self::Blast => "blastn",
            Self::Fasta36 => "fasta36",
        }
    }

    pub fn default_database(self) -> &'static str {
        match self {
            Self::Blast => DEFAULT_BLAST_DATABASE,
            Self::Fasta36 => DEFAULT_FASTA_DATABASE,
        }
    }
}

impl fmt::Display for AlignerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blast => write!(f, "blast"),
            Self::Fasta36 => write!(f, "fasta36"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AlignerError {
    #[error("{kind} database not found: {}", path.display())]
    DatabaseNotFound { kind: AlignerKind, path: PathBuf },

    #[error("Could not find the {program} executable in PATH")]
    ToolNotFound { program: String },

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Failed to parse aligner output: {0}")]
    Parse(#[from] ParseError),
}

/// How to run the aligner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignerConfig {
    pub kind: AlignerKind,
    pub database: PathBuf,
    pub threads: usize,
}

impl AlignerConfig {
    /// Use `database`, or the aligner's default database when `None`
    pub fn new(kind: AlignerKind, database: Option<PathBuf>, threads: usize) -> Self {
        Self {
            kind,
            database: database.unwrap_or_else(|| PathBuf::from(kind.default_database())),
            threads: threads.max(1),
        }
    }

    /// Command-line arguments for aligning `query` against the database
    pub fn arguments(&self, query: &Path) -> Vec<String> {
        let query = query.display().to_string();
        let database = self.database.display().to_string();
        let threads = self.threads.to_string();
        match self.kind {
            AlignerKind::Blast => vec![
                "-task".into(),
                "blastn".into(),
                "-query".into(),
                query,
                "-db".into(),
                database,
                "-num_threads".into(),
                threads,
                "-outfmt".into(),
                "6".into(),
            ],
            AlignerKind::Fasta36 => vec!["-T".into(), threads, "-m".into(), "8".into(), query, database],
        }
    }

    /// Check that the database exists.
    ///
    /// A BLAST database is a prefix: some file in its directory must start
    /// with it. A FASTA36 library is a plain file.
    ///
    /// # Errors
    ///
    /// Returns `AlignerError::DatabaseNotFound` if it does not.
    pub fn check_database(&self) -> Result<(), AlignerError> {
        let found = match self.kind {
            AlignerKind::Blast => blast_database_exists(&self.database),
            AlignerKind::Fasta36 => self.database.is_file(),
        };
        if found {
            Ok(())
        } else {
            Err(AlignerError::DatabaseNotFound {
                kind: self.kind,
                path: self.database.clone(),
            })
        }
    }
}

fn blast_database_exists(prefix: &Path) -> bool {
    let Some(stem) = prefix.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let directory = match prefix.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::read_dir(directory)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .any(|entry| entry.file_name().to_string_lossy().starts_with(stem))
        })
        .unwrap_or(false)
}

/// Align the queries in `query_fasta` and parse the tabular hits
///
/// # Errors
///
/// Returns an `AlignerError` if the database is missing, the aligner cannot
/// be run or fails, or its output cannot be parsed.
pub fn run_alignment(config: &AlignerConfig, query_fasta: &Path) -> Result<Vec<AlignmentHit>, AlignerError> {
    config.check_database()?;

    let program = config.kind.program();
    let args = config.arguments(query_fasta);
    info!("Running {program} against {}", config.database.display());
    debug!("{program} {}", args.join(" "));

    let output = run_tool(program, &args)?;
    if !output.status.success() {
        return Err(AlignerError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let hits = parse_hit_bytes(output.stdout.as_slice())?;
    info!("{program} reported {} hit(s)", hits.len());
    Ok(hits)
}

fn run_tool(program: &str, args: &[String]) -> Result<Output, AlignerError> {
    Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            AlignerError::ToolNotFound {
                program: program.to_string(),
            }
        } else {
            AlignerError::Spawn {
                program: program.to_string(),
                source: e,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_blast_arguments() {
        let config = AlignerConfig::new(AlignerKind::Blast, Some(PathBuf::from("db/Spacers")), 4);
        let args = config.arguments(Path::new("phage.fasta"));
        assert_eq!(
            args,
            vec![
                "-task", "blastn", "-query", "phage.fasta", "-db", "db/Spacers", "-num_threads", "4",
                "-outfmt", "6"
            ]
        );
    }

    #[test]
    fn test_fasta36_arguments() {
        let config = AlignerConfig::new(AlignerKind::Fasta36, Some(PathBuf::from("spacers.fa")), 2);
        let args = config.arguments(Path::new("phage.fasta"));
        assert_eq!(args, vec!["-T", "2", "-m", "8", "phage.fasta", "spacers.fa"]);
    }

    #[test]
    fn test_default_database_and_threads() {
        let config = AlignerConfig::new(AlignerKind::Fasta36, None, 0);
        assert_eq!(config.database, PathBuf::from(DEFAULT_FASTA_DATABASE));
        assert_eq!(config.threads, 1);
        assert_eq!(AlignerKind::Blast.program(), "blastn");
        assert_eq!(AlignerKind::Fasta36.to_string(), "fasta36");
    }

    #[test]
    fn test_blast_database_prefix_check() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("SpacersDB.nsq"), b"").unwrap();

        let found = AlignerConfig::new(AlignerKind::Blast, Some(dir.path().join("SpacersDB")), 1);
        assert!(found.check_database().is_ok());

        let missing = AlignerConfig::new(AlignerKind::Blast, Some(dir.path().join("Other")), 1);
        assert!(matches!(
            missing.check_database(),
            Err(AlignerError::DatabaseNotFound { kind: AlignerKind::Blast, .. })
        ));
    }

    #[test]
    fn test_fasta_database_check() {
        let dir = TempDir::new().unwrap();
        let library = dir.path().join("spacers.fasta");

        let config = AlignerConfig::new(AlignerKind::Fasta36, Some(library.clone()), 1);
        assert!(config.check_database().is_err());

        std::fs::write(&library, b">s1\nACGT\n").unwrap();
        assert!(config.check_database().is_ok());
    }

    #[test]
    fn test_missing_database_fails_before_running() {
        let dir = TempDir::new().unwrap();
        let config = AlignerConfig::new(AlignerKind::Fasta36, Some(dir.path().join("none.fa")), 1);
        let err = run_alignment(&config, Path::new("phage.fasta")).unwrap_err();
        assert!(err.to_string().contains("database not found"));
    }
}
