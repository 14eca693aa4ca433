//! CLI reconcile integration tests
//!
//! These tests run the `scdx` binary end to end: configuration flags are
//! passed through to the engine and failures map to documented exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn scdx(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scdx"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn write_input(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

fn active_count(db: &Path) -> i64 {
    let conn = Connection::open(db).unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM active_records WHERE collection = 'products'",
        [],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn test_cli_reconcile_writes_and_reports() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let input = write_input(
        &temp_dir,
        "desired.json",
        r#"[{"sku": "a", "region": "eu"}, {"sku": "b", "region": "us"}]"#,
    );

    let output = scdx(
        temp_dir.path(),
        &[
            "reconcile",
            "--input",
            input.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--collection",
            "products",
            "--key-field",
            "region",
        ],
    );

    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("insert=2 update=0 delete=0"), "stdout: {}", stdout);
    assert_eq!(active_count(&db), 2);

    // Second run with the same snapshot is a no-op
    let output = scdx(
        temp_dir.path(),
        &[
            "reconcile",
            "--input",
            input.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--collection",
            "products",
            "--key-field",
            "region",
        ],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("no ops to send"));
}

#[test]
fn test_cli_dry_run_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let input = write_input(&temp_dir, "desired.ndjson", "{\"sku\": \"a\"}\n{\"sku\": \"b\"}\n");

    let output = scdx(
        temp_dir.path(),
        &[
            "reconcile",
            "--input",
            input.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--collection",
            "products",
            "--dry-run",
            "--json",
        ],
    );

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["stats"]["insert"], 2);
    assert_eq!(report["outcome"]["outcome"], "dry_run");
    assert!(!db.exists(), "a dry run must not create the store");
}

#[test]
fn test_cli_config_file_and_history() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let config = write_input(
        &temp_dir,
        "scdx.toml",
        &format!(
            "[store]\npath = {:?}\n\n[scope]\ncollection = \"products\"\n\n[hashing]\npick = [\"sku\"]\n",
            db.to_string_lossy()
        ),
    );
    let first = write_input(&temp_dir, "v1.json", r#"[{"sku": "a", "price": 1}]"#);
    let second = write_input(&temp_dir, "v2.json", r#"[{"sku": "a", "price": 2}]"#);

    for input in [&first, &second] {
        let output = scdx(
            temp_dir.path(),
            &[
                "reconcile",
                "--config",
                config.to_str().unwrap(),
                "--input",
                input.to_str().unwrap(),
            ],
        );
        assert!(
            output.status.success(),
            "Stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let output = scdx(
        temp_dir.path(),
        &["history", "--collection", "products", "--db", db.to_str().unwrap()],
    );
    assert!(output.status.success());
    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["payload"]["price"], 2);
    assert!(lines[0]["updated_ts"].is_string());
}

#[test]
fn test_cli_migrate() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    let output = scdx(temp_dir.path(), &["migrate", "--db", db.to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("001_versioned_records"));
    assert!(stdout.contains("002_active_view_and_indexes"));
}

#[test]
fn test_cli_missing_store_exits_with_configuration_code() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_input(&temp_dir, "desired.json", "[]");

    let output = scdx(
        temp_dir.path(),
        &["reconcile", "--input", input.to_str().unwrap(), "--collection", "products"],
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_CONFIGURATION"));
}

#[test]
fn test_cli_unreachable_store_exits_with_connection_code() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_input(&temp_dir, "desired.json", "[]");
    let db = temp_dir.path().join("missing").join("store.db");

    let output = scdx(
        temp_dir.path(),
        &[
            "reconcile",
            "--input",
            input.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--collection",
            "products",
        ],
    );

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_cli_non_object_entry_is_generic_failure() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");
    let input = write_input(&temp_dir, "desired.json", "[1, 2]");

    let output = scdx(
        temp_dir.path(),
        &[
            "reconcile",
            "--input",
            input.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--collection",
            "products",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_SERIALIZATION"));
}

#[test]
fn test_cli_trace_id_is_attached_to_errors() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_input(&temp_dir, "desired.json", "[]");

    let output = scdx(
        temp_dir.path(),
        &[
            "--trace-id",
            "job-42",
            "reconcile",
            "--input",
            input.to_str().unwrap(),
            "--collection",
            "products",
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("trace_id: job-42"), "stderr: {}", stderr);
}
