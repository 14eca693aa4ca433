// Integration tests for the migration framework

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rusqlite::Connection;
use scdx_store::migrations::{applied_migrations, apply_migrations};

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn names_of(conn: &Connection, kind: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
        .unwrap();
    stmt.query_map([kind], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: An empty SQLite database
    let mut conn = setup_test_db();

    // When: Migrations are applied
    let result = apply_migrations(&mut conn);

    // Then: All migrations succeed
    assert!(result.is_ok(), "Migrations should succeed: {:?}", result.err());

    let tables = names_of(&conn, "table");
    for expected in ["schema_version", "versioned_records", "sqlite_sequence"] {
        assert!(tables.contains(&expected.to_string()), "Missing table: {}", expected);
    }
    assert_eq!(names_of(&conn, "view"), vec!["active_records"]);
}

#[test]
fn test_indexes_created() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let indexes = names_of(&conn, "index");
    for expected in [
        "idx_versioned_records_active_hash",
        "idx_versioned_records_window",
        "idx_versioned_records_window_key",
    ] {
        assert!(indexes.contains(&expected.to_string()), "Missing index: {}", expected);
    }
}

#[test]
fn test_migrations_are_idempotent() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();
    apply_migrations(&mut conn).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(applied_migrations(&conn).unwrap().len(), 2);
}

#[test]
fn test_checksums_recorded() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let checksums: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT checksum FROM schema_version ORDER BY id")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    };
    assert_eq!(checksums.len(), 2);
    assert!(checksums.iter().all(|c| c.len() == 64));
}

#[test]
fn test_payload_must_be_json() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let result = conn.execute(
        "INSERT INTO versioned_records (id, collection, hash, key, payload, start_ts)
         VALUES ('r1', 'c', 'h', 'default', 'not json', 0)",
        [],
    );
    assert!(result.is_err());
}
