//! Integration tests for the ocean-query binary.
//!
//! Every command here either needs no database or points at a port nothing
//! listens on, so the suite runs offline.

use std::io::Write;

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use tempfile::{NamedTempFile, TempDir};

/// Command isolated from the caller's config files and `DB_*` variables
fn cmd(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("ocean-query");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("OCEAN_TABLE")
        .env("DB_HOST", "127.0.0.1")
        .env("DB_PORT", "1")
        .env("DB_NAME", "ocean_db")
        .env("DB_USER", "sammy")
        .env("DB_PASSWORD", "");
    cmd
}

fn argo_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "datetime,lat,lon,mld").unwrap();
    writeln!(file, "2019-01-29 08:13:00,5.2,64.1,41.0").unwrap();
    writeln!(file, "2019-01-30 02:00:00,-3.5,70.9,NaN").unwrap();
    file
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("load"))
        .stdout(predicate::str::contains("location"))
        .stdout(predicate::str::contains("selftest"));
}

#[test]
fn test_dates_help_describes_midnight_bounds() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["dates", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("up to and including end 00:00"))
        .stdout(predicate::str::contains("matched at midnight"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ocean-query"));
}

#[test]
fn test_config_masks_password() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .env("DB_HOST", "db.internal")
        .env("DB_PASSWORD", "hunter2")
        .args(["config", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db.internal"))
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_config_json_output() {
    let home = TempDir::new().unwrap();
    let output = cmd(&home)
        .env("DB_PORT", "6543")
        .args(["config", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["params"]["port"], 6543);
    assert_eq!(value["url"], "postgresql://sammy:@127.0.0.1:6543/ocean_db");
}

#[test]
fn test_config_reads_local_toml() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join(".ocean-query.toml"),
        "[database]\nname = \"argo_archive\"\n"
    )
    .unwrap();
    cmd(&home)
        .env_remove("DB_NAME")
        .args(["config", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("argo_archive"));
}

#[test]
fn test_invalid_port_is_error() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .env("DB_PORT", "not-a-port")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_load_missing_file() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["load", "nonexistent.csv", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_load_default_file_missing() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["load", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_load_shows_preview_and_can_be_declined() {
    let home = TempDir::new().unwrap();
    let csv = argo_csv();
    cmd(&home)
        .args(["load", csv.path().to_str().unwrap(), "--no-color"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows: 2"))
        .stdout(predicate::str::contains("datetime  "))
        .stdout(predicate::str::contains("NULL"))
        .stdout(predicate::str::contains("Would you like to load this data into the database?"))
        .stdout(predicate::str::contains("Data loading cancelled."));
}

#[test]
fn test_load_unreachable_database_fails() {
    let home = TempDir::new().unwrap();
    let csv = argo_csv();
    cmd(&home)
        .args(["load", csv.path().to_str().unwrap(), "--yes", "--no-color"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_query_commands_fail_fast_without_database() {
    let home = TempDir::new().unwrap();
    for args in [
        vec!["sample"],
        vec!["count"],
        vec!["summary"],
        vec!["dates", "--start", "2019-01-29", "--end", "2019-01-30"],
        vec!["selftest"]
    ] {
        cmd(&home)
            .args(&args)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Error"));
    }
}

#[test]
fn test_location_accepts_negative_ranges() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["location", "--lat", "-10", "10", "--lon", "-80", "-60", "--limit", "5"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("unexpected argument").not());
}

#[test]
fn test_location_requires_two_values() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["location", "--lat", "5", "--lon", "60", "80"])
        .assert()
        .code(2);
}

#[test]
fn test_check_unreachable_prints_hints() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["check", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("✗"))
        .stderr(predicate::str::contains("Please check:"))
        .stderr(predicate::str::contains("PostgreSQL is running"));
}

#[test]
fn test_unknown_format_rejected() {
    let home = TempDir::new().unwrap();
    cmd(&home).args(["count", "-f", "sarif"]).assert().code(2);
}
