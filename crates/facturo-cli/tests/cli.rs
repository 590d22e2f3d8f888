//! Command-line behavior of the `facturo` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SCENARIO: &str = "FACTURA #123\nComercial XYZ S.A.\nFecha: 01/03/2024\nPantalla LCD 45.00 2 90.00\nGarantía de 6 meses\n";

/// `facturo` with config and data directories isolated in `home`.
fn facturo(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("facturo").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("GOOGLE_VISION_API_KEY");
    cmd
}

#[test]
fn test_parse_text_file() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("invoice.txt");
    fs::write(&input, SCENARIO).unwrap();

    facturo(home.path())
        .arg("parse")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"provider\": \"Comercial XYZ S.A.\""))
        .stdout(predicate::str::contains("\"issue_date\": \"2024-03-01\""))
        .stdout(predicate::str::contains("\"expiration_date\": \"2024-08-28\""));
}

#[test]
fn test_parse_text_output() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("invoice.txt");
    fs::write(&input, SCENARIO).unwrap();

    facturo(home.path())
        .args(["parse", "--format", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Warranty: 180 days (until 2024-08-28)"));
}

#[test]
fn test_parse_stdin_report() {
    let home = TempDir::new().unwrap();

    facturo(home.path())
        .args(["parse", "--report", "-"])
        .write_stdin("Gracias por su compra\n2024-05-10\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"warnings\""))
        .stdout(predicate::str::contains("Could not identify title"));
}

#[test]
fn test_parse_without_date_fails() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("invoice.txt");
    fs::write(&input, "FACTURA\nComercial XYZ S.A.\n").unwrap();

    facturo(home.path())
        .arg("parse")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no issue date found"));
}

#[test]
fn test_process_rejects_unknown_backend() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("scan.png");
    fs::write(&input, b"not decoded before the backend is resolved").unwrap();

    facturo(home.path())
        .args(["process", "--backend", "paddle"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported recognition backend"));
}

#[test]
fn test_process_missing_input() {
    let home = TempDir::new().unwrap();

    facturo(home.path())
        .args(["process", "does-not-exist.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_config_init_get_set() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("facturo.json");

    facturo(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    facturo(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "ocr.backend"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"vision\""));

    facturo(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "extraction.default_warranty_days", "30"])
        .assert()
        .success();

    facturo(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "extraction.default_warranty_days"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30"));

    facturo(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "ocr.no_such_key", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_configured_default_window_applies_to_parse() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("facturo.json");
    fs::write(&config, r#"{ "extraction": { "default_warranty_days": 30 } }"#).unwrap();
    let input = home.path().join("invoice.txt");
    fs::write(&input, "Fecha 01/03/2024\n").unwrap();

    facturo(home.path())
        .arg("--config")
        .arg(&config)
        .arg("parse")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"expiration_date\": \"2024-03-31\""));
}

#[test]
fn test_tessdata_status_without_models() {
    let home = TempDir::new().unwrap();

    facturo(home.path())
        .args(["tessdata", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No language models found"));
}
