use rusqlite::Connection;
use wordstore_core::db::migrations::{latest_version, schema_version};
use wordstore_core::db::{open_db, open_db_in_memory, open_db_tracked, DbError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "word_table");
}

#[test]
fn open_db_tracked_reports_creation_only_on_first_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracked.db");

    let first = open_db_tracked(&path).unwrap();
    assert!(first.created);
    first
        .connection
        .execute("DELETE FROM word_table;", [])
        .unwrap();
    drop(first);

    let second = open_db_tracked(&path).unwrap();
    assert!(!second.created);
    assert_eq!(schema_version(&second.connection).unwrap(), latest_version());
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute("INSERT INTO word_table (word) VALUES ('kept');", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM word_table;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn file_databases_use_wal_journal() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wal.db")).unwrap();

    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_ascii_lowercase(), "wal");
}

#[test]
fn memory_path_opens_in_memory_database() {
    let conn = open_db(":memory:").unwrap();
    assert_table_exists(&conn, "word_table");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_blank_words() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute("INSERT INTO word_table (word) VALUES ('   ');", []);
    assert!(result.is_err());
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
