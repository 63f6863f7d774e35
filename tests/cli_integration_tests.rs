// End-to-end tests of the ratingshift binary over generated item tables

use assert_cmd::Command;
use predicates::prelude::*;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// 30 years of dramas, six per year; ratings drop by 0.6 from 2005 on and the
/// sixth item of each year has too few votes to be analyzed
fn write_catalog(dir: &TempDir) -> PathBuf {
    let mut csv = String::from("id,title,year,categories,rating,votes,critical_acclaim,legacy,technical\n");
    for year in 1990..2020 {
        for k in 0..6 {
            let shift = if year >= 2005 { -0.6 } else { 0.0 };
            let rating = 7.0 + shift + 0.1 * f64::from(k) - 0.25;
            let x = f64::from(k + (year % 3));
            let votes = if k == 5 { 10 } else { 5_000 };
            let _ = writeln!(
                csv,
                "tt{year}{k},Title {year} {k},{year},Drama|Crime,{rating:.2},{votes},{x},{},{}",
                2.0 * x,
                x * x
            );
        }
    }
    let path = dir.path().join("titles.csv");
    fs::write(&path, csv).unwrap();
    path
}

fn ratingshift(input: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("ratingshift").unwrap();
    cmd.arg(input)
        .arg("--preset")
        .arg("permissive")
        .arg("--min-votes")
        .arg("1000")
        .arg("--candidates")
        .arg("1998,2005,2012");
    cmd
}

#[test]
fn test_text_report_names_strongest_cutoff() {
    let dir = TempDir::new().unwrap();
    let input = write_catalog(&dir);

    ratingshift(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 180 items"))
        .stdout(predicate::str::contains("150 with >= 1000 votes analyzed"))
        .stdout(predicate::str::contains("REGIME CHANGE RANKING"))
        .stdout(predicate::str::contains("Strongest evidence: 2005"));
}

#[test]
fn test_json_report_parses() {
    let dir = TempDir::new().unwrap();
    let input = write_catalog(&dir);

    let output = ratingshift(&input).arg("--format").arg("json").output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["format"], "ratingshift-json-v1");
    assert_eq!(json["analyzed_items"], 150);
    assert_eq!(json["items"].as_array().unwrap().len(), 150);
    assert_eq!(json["regime"]["candidates"][0]["candidate_year"], 2005);
    assert!(json.get("supplements").is_none());
}

#[test]
fn test_csv_ranking_and_item_table() {
    let dir = TempDir::new().unwrap();
    let input = write_catalog(&dir);
    let items_path = dir.path().join("items.csv");

    ratingshift(&input)
        .arg("--format")
        .arg("csv")
        .arg("--items-csv")
        .arg(&items_path)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("rank,year,status,n_before,n_after"))
        .stdout(predicate::str::contains("1,2005,evaluated"));

    let items = fs::read_to_string(&items_path).unwrap();
    assert!(items.starts_with("id,primary_category,cohort"));
    assert_eq!(items.lines().count(), 151);
    assert!(items.contains("tt19900,Drama,1990s/Drama,"));
}

#[test]
fn test_output_file_and_supplements() {
    let dir = TempDir::new().unwrap();
    let input = write_catalog(&dir);
    let report_path = dir.path().join("report.json");

    ratingshift(&input)
        .arg("--supplements")
        .arg("--format")
        .arg("json")
        .arg("-o")
        .arg(&report_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["supplements"]["yearly"].as_array().unwrap().len(), 30);
    assert_eq!(json["supplements"]["franchises"]["franchise_items"], 0);
    assert!(json["supplements"]["documentaries"].is_null());
    assert!(json["supplements"]["top_rated"].as_array().unwrap().is_empty());
}

#[test]
fn test_config_file_is_used() {
    let dir = TempDir::new().unwrap();
    let input = write_catalog(&dir);
    let config_path = dir.path().join("ratingshift.toml");
    fs::write(
        &config_path,
        "[dataset]\nmin_votes = 0\n\n[scoring]\nmin_cohort_size = 5\n\n[regime]\ncandidate_years = [2005]\nmin_group_size = 10\n",
    )
    .unwrap();

    let output = Command::cargo_bin("ratingshift")
        .unwrap()
        .arg(&input)
        .arg("--config")
        .arg(&config_path)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["analyzed_items"], 180);
    assert_eq!(json["regime"]["candidates"].as_array().unwrap().len(), 1);
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("ratingshift")
        .unwrap()
        .arg(dir.path().join("absent.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

#[test]
fn test_duplicate_identifier_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("dupes.csv");
    fs::write(
        &input,
        "id,year,categories,rating,votes\ntt1,1999,Drama,7.0,5000\ntt1,2001,Drama,6.0,5000\n",
    )
    .unwrap();

    Command::cargo_bin("ratingshift")
        .unwrap()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate item identifier 'tt1'"));
}

#[test]
fn test_missing_column_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("novotes.csv");
    fs::write(&input, "id,year,categories,rating\ntt1,1999,Drama,7.0\n").unwrap();

    Command::cargo_bin("ratingshift")
        .unwrap()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required column 'votes'"));
}

#[test]
fn test_invalid_override_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_catalog(&dir);

    Command::cargo_bin("ratingshift")
        .unwrap()
        .arg(&input)
        .arg("--min-cohort-size")
        .arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("scoring.min_cohort_size"));
}
