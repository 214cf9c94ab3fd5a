//! Command-line tests driving the compiled binary

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SPACERS: &str = "\
spacer_id\torganism_id\torganism_name\tspecies\tgenus\tfamily\torder\tspacer_sequence\tspacer_length\tarray_spacer_count\tposition_in_locus
e1\tNC_000913\tEscherichia coli K-12\tEscherichia coli\tEscherichia\tEnterobacteriaceae\tEnterobacterales\tGGTTTCACCGCCAGCGAGATACGTTCATGGCG\t32\t12\t1
e2\tNC_000913\tEscherichia coli K-12\tEscherichia coli\tEscherichia\tEnterobacteriaceae\tEnterobacterales\tCGGTTGACCGCAGGGATTAGCGTGATACGTCC\t32\t12\t5
s1\tNC_003197\tSalmonella enterica LT2\tSalmonella enterica\tSalmonella\tEnterobacteriaceae\tEnterobacterales\tAACGCGGTTCGTTTGGCGGCAAAATCCGGCTG\t32\t8\t2
";

const HITS: &str = "\
T4like|phage 1\te1\t100.0\t32\t0\t0\t1200\t1231\t1\t32\t2e-10\t60.2
T4like|phage 1\te2\t100.0\t32\t0\t0\t5600\t5631\t1\t32\t2e-10\t60.2
lambda\ts1\t93.8\t32\t2\t0\t300\t331\t1\t32\t1e-8\t54.7
lambda\te1\t100.0\t30\t0\t0\t900\t929\t3\t32\t1e-8\t54.7
";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("spacers.tsv"), SPACERS).unwrap();
        std::fs::write(dir.path().join("hits.m8"), HITS).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn cli() -> Command {
    Command::cargo_bin("crispr-host-id").unwrap()
}

fn identify(fixture: &Fixture) -> Command {
    let mut cmd = cli();
    cmd.arg("identify")
        .arg("--hits")
        .arg(fixture.path("hits.m8"))
        .arg("--catalog")
        .arg(fixture.path("spacers.tsv"));
    cmd
}

#[test]
fn test_identify_text_output() {
    let fixture = Fixture::new();
    identify(&fixture)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "T4like|phage 1\tEscherichia\tgenus (confidence level 1)",
        ))
        .stdout(predicate::str::contains("lambda\tNo candidates within 1 mismatch(es)"));
}

#[test]
fn test_identify_with_higher_tolerance() {
    let fixture = Fixture::new();
    // e1 only covers 30 of 32 bases, so lambda needs 2 mismatches
    identify(&fixture)
        .args(["--mismatch", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lambda\tEscherichia\tgenus (confidence level 3)"));
}

#[test]
fn test_identify_json_output() {
    let fixture = Fixture::new();
    let output = identify(&fixture)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["queries"], 2);
    assert_eq!(json["summary"]["resolved"], 1);
    assert_eq!(json["summary"]["no_candidates"], 1);

    let first = &json["outcomes"][0];
    assert_eq!(first["outcome"], "resolved");
    assert_eq!(first["host_label"], "Escherichia");
    assert_eq!(first["criterion"], "unanimous_genus");
    assert_eq!(first["confidence_level"], 1);

    let second = &json["outcomes"][1];
    assert_eq!(second["outcome"], "no_candidates");
    assert_eq!(second["query_id"], "lambda");
}

#[test]
fn test_identify_tsv_output() {
    let fixture = Fixture::new();
    identify(&fixture)
        .args(["--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("query_id\toutcome\thost"))
        .stdout(predicate::str::contains("\tresolved\tEscherichia\tgenus\t1\t1\t2\te1,e2"))
        .stdout(predicate::str::contains("lambda\tno_candidates"));
}

#[test]
fn test_identify_report() {
    let fixture = Fixture::new();
    identify(&fixture)
        .args(["--report", "--mismatch", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Query: lambda"))
        .stdout(predicate::str::contains("Genus: Salmonella; Different positions: 1"))
        .stdout(predicate::str::contains("Host is Escherichia. Found using criterion #3"));
}

#[test]
fn test_identify_rejects_out_of_range_mismatch() {
    let fixture = Fixture::new();
    identify(&fixture)
        .args(["--mismatch", "6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the supported range"));
}

#[test]
fn test_identify_requires_input_or_hits() {
    cli()
        .args(["identify", "--catalog", "spacers.tsv"])
        .assert()
        .failure();
}

#[test]
fn test_identify_without_hits() {
    let fixture = Fixture::new();
    std::fs::write(fixture.path("empty.m8"), "").unwrap();
    cli()
        .arg("identify")
        .arg("--hits")
        .arg(fixture.path("empty.m8"))
        .arg("--catalog")
        .arg(fixture.path("spacers.tsv"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No hits found."));
}

#[test]
fn test_identify_exports_joined_tables() {
    let fixture = Fixture::new();
    let tables = fixture.path("tables");
    identify(&fixture)
        .arg("--table")
        .arg(&tables)
        .assert()
        .success();

    let phage = std::fs::read_to_string(tables.join("T4like_phage_1.tsv")).unwrap();
    assert_eq!(phage.lines().count(), 3);

    // Exported before filtering: lambda's rejected hits are still listed
    let lambda = std::fs::read_to_string(tables.join("lambda.tsv")).unwrap();
    assert_eq!(lambda.lines().count(), 3);
    assert!(lambda.contains("Salmonella"));
}

/// Query ids that sanitize to the same file name, or to nothing usable
const CLASHING_HITS: &str = "\
a|b\te1\t100.0\t32\t0\t0\t100\t131\t1\t32\t2e-10\t60.2
a/b\ts1\t100.0\t32\t0\t0\t200\t231\t1\t32\t2e-10\t60.2
|||\te2\t100.0\t32\t0\t0\t300\t331\t1\t32\t2e-10\t60.2
good\te1\t100.0\t32\t0\t0\t400\t431\t1\t32\t2e-10\t60.2
";

#[test]
fn test_identify_table_names_never_overwrite() {
    let fixture = Fixture::new();
    std::fs::write(fixture.path("clashing.m8"), CLASHING_HITS).unwrap();
    let tables = fixture.path("tables");

    cli()
        .arg("identify")
        .arg("--hits")
        .arg(fixture.path("clashing.m8"))
        .arg("--catalog")
        .arg(fixture.path("spacers.tsv"))
        .arg("--table")
        .arg(&tables)
        .assert()
        .success()
        .stdout(predicate::str::contains("a|b\tEscherichia"))
        .stdout(predicate::str::contains("a/b\tSalmonella"))
        .stdout(predicate::str::contains("|||\tEscherichia"))
        .stdout(predicate::str::contains("good\tEscherichia"));

    let first = std::fs::read_to_string(tables.join("a_b.tsv")).unwrap();
    let second = std::fs::read_to_string(tables.join("a_b.2.tsv")).unwrap();
    assert!(first.contains("a|b\te1"));
    assert!(second.contains("a/b\ts1"));
    assert!(!first.contains("a/b"));

    let fallback = std::fs::read_to_string(tables.join("query_3.tsv")).unwrap();
    assert!(fallback.contains("|||\te2"));
    assert!(tables.join("good.tsv").exists());
}

#[test]
fn test_identify_unusable_query_id_does_not_abort() {
    let fixture = Fixture::new();
    std::fs::write(
        fixture.path("odd.m8"),
        "|||\te2\t100.0\t32\t0\t0\t300\t331\t1\t32\t2e-10\t60.2\n\
         good\ts1\t100.0\t32\t0\t0\t400\t431\t1\t32\t2e-10\t60.2\n",
    )
    .unwrap();
    let tables = fixture.path("tables");

    cli()
        .arg("identify")
        .arg("--hits")
        .arg(fixture.path("odd.m8"))
        .arg("--catalog")
        .arg(fixture.path("spacers.tsv"))
        .arg("--table")
        .arg(&tables)
        .args(["--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("good\tresolved\tSalmonella"))
        .stdout(predicate::str::contains("|||\tresolved\tEscherichia"));

    assert!(tables.join("query_1.tsv").exists());
    assert!(tables.join("good.tsv").exists());
}

#[test]
fn test_identify_unknown_flag_warns() {
    let fixture = Fixture::new();
    identify(&fixture)
        .arg("--unknown")
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning: keeping spacers of unknown genus"));
}

#[test]
fn test_identify_missing_aligner_database() {
    let fixture = Fixture::new();
    std::fs::write(fixture.path("phages.fasta"), ">lambda\nACGTACGT\n").unwrap();
    cli()
        .arg("identify")
        .arg("--input")
        .arg(fixture.path("phages.fasta"))
        .args(["--aligner", "fasta36", "--database"])
        .arg(fixture.path("missing.fasta"))
        .arg("--catalog")
        .arg(fixture.path("spacers.tsv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("database not found"));
}

#[test]
fn test_identify_missing_catalog() {
    let fixture = Fixture::new();
    cli()
        .arg("identify")
        .arg("--hits")
        .arg(fixture.path("hits.m8"))
        .arg("--catalog")
        .arg(fixture.path("missing.sqlite"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open spacer catalog"));
}

#[test]
fn test_catalog_stats() {
    let fixture = Fixture::new();
    cli()
        .args(["catalog", "stats", "--catalog"])
        .arg(fixture.path("spacers.tsv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Spacers:            3"))
        .stdout(predicate::str::contains("Organisms:          2"));
}

#[test]
fn test_catalog_show() {
    let fixture = Fixture::new();
    cli()
        .args(["catalog", "show", "s1", "--catalog"])
        .arg(fixture.path("spacers.tsv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Salmonella enterica LT2"))
        .stdout(predicate::str::contains("position 2 of 8"));

    cli()
        .args(["catalog", "show", "nope", "--catalog"])
        .arg(fixture.path("spacers.tsv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_catalog_export_roundtrip() {
    let fixture = Fixture::new();
    let exported = fixture.path("catalog.json");
    cli()
        .args(["catalog", "export"])
        .arg(&exported)
        .arg("--catalog")
        .arg(fixture.path("spacers.tsv"))
        .assert()
        .success();

    assert_exported(&exported);

    // The export is itself a usable catalog
    identify_with_catalog(&fixture, &exported)
        .assert()
        .success()
        .stdout(predicate::str::contains("Escherichia"));
}

fn assert_exported(path: &Path) {
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["spacers"].as_array().unwrap().len(), 3);
    assert_eq!(json["version"], "1.0.0");
}

fn identify_with_catalog(fixture: &Fixture, catalog: &Path) -> Command {
    let mut cmd = cli();
    cmd.arg("identify")
        .arg("--hits")
        .arg(fixture.path("hits.m8"))
        .arg("--catalog")
        .arg(catalog);
    cmd
}
