use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn itinera(db: &Path) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("itinera").into();
    cmd.env("ITINERA_DB", db);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("OPENAI_API_KEY");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Returns (tempdir_guard, database_path). The guard must be kept alive.
fn database() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("itinera.db");
    (tmp, db)
}

fn create_trip(db: &Path, name: &str) -> String {
    let output = itinera(db)
        .args(["trip", "create", name])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

// --- Binary startup ---

#[test]
fn binary_runs() {
    let mut cmd: Command = cargo_bin_cmd!("itinera").into();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("itinera"));
}

// --- Trips ---

#[test]
fn trip_create_prints_id_and_lists() {
    let (_tmp, db) = database();
    let id = create_trip(&db, "Iceland");
    assert_eq!(id.len(), 36);

    itinera(&db)
        .args(["trip", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Iceland"))
        .stdout(predicate::str::contains(&id));
}

#[test]
fn db_flag_overrides_environment() {
    let (tmp, db) = database();
    let other = tmp.path().join("other.db");
    create_trip(&db, "Iceland");

    itinera(&db)
        .arg("--db")
        .arg(&other)
        .args(["trip", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No trips"));
}

// --- Documents ---

#[test]
fn document_add_and_list() {
    let (tmp, db) = database();
    let trip = create_trip(&db, "Iceland");
    let pdf = tmp.path().join("booking.pdf");
    fs::write(&pdf, b"%PDF-1.4").unwrap();

    itinera(&db)
        .args(["document", "add", trip.as_str()])
        .arg(&pdf)
        .assert()
        .success();

    itinera(&db)
        .args(["document", "list", trip.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("booking.pdf"))
        .stdout(predicate::str::contains("uploaded"));
}

#[test]
fn document_add_missing_file_fails() {
    let (tmp, db) = database();
    let trip = create_trip(&db, "Iceland");

    itinera(&db)
        .args(["document", "add", trip.as_str()])
        .arg(tmp.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn document_add_unknown_trip_fails() {
    let (tmp, db) = database();
    let pdf = tmp.path().join("booking.pdf");
    fs::write(&pdf, b"%PDF-1.4").unwrap();

    itinera(&db)
        .args(["document", "add", "0191b6a4-5c4e-7d7a-9c1e-2f3a4b5c6d7e"])
        .arg(&pdf)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Trip not found"));
}

#[test]
fn invalid_trip_id_is_rejected() {
    let (_tmp, db) = database();

    itinera(&db)
        .args(["items", "not-a-uuid"])
        .assert()
        .failure();
}

// --- Processing ---

#[test]
fn process_requires_openai_key() {
    let (_tmp, db) = database();
    let trip = create_trip(&db, "Iceland");

    itinera(&db)
        .args(["process", trip.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

// --- Listings ---

#[test]
fn empty_listings() {
    let (_tmp, db) = database();
    let trip = create_trip(&db, "Iceland");

    itinera(&db)
        .args(["items", trip.as_str()])
        .assert()
        .success()
        .stderr(predicate::str::contains("No items in Iceland"));

    itinera(&db)
        .args(["places", "--kind", "hotel"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No places"));
}

#[test]
fn places_rejects_unknown_kind() {
    let (_tmp, db) = database();

    itinera(&db)
        .args(["places", "--kind", "castle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid place kind"));
}
