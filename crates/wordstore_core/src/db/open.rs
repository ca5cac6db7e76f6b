//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory connections for the word store.
//! - Configure pragmas the store relies on (busy timeout, WAL for files).
//! - Run schema migrations before handing a connection out.
//!
//! # Invariants
//! - File connections run in WAL journal mode so a reader connection can
//!   scan while the single writer commits.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Connection returned by [`open_db_tracked`].
#[derive(Debug)]
pub struct OpenedDb {
    pub connection: Connection,
    /// `true` when this open created the schema, i.e. the database had no
    /// version marker before migrations ran.
    pub created: bool,
}

/// Storage path that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenMode {
    File,
    Memory,
}

impl OpenMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

/// Returns whether `path` names the in-memory database.
pub fn is_in_memory_path(path: impl AsRef<Path>) -> bool {
    path.as_ref() == Path::new(IN_MEMORY_PATH)
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Creates the file when it does not exist yet.
/// - Switches the database to WAL journal mode.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_tracked(path).map(|opened| opened.connection)
}

/// Like [`open_db`], but also reports whether the schema was created.
pub fn open_db_tracked(path: impl AsRef<Path>) -> DbResult<OpenedDb> {
    let path = path.as_ref();
    if is_in_memory_path(path) {
        return open_with(OpenMode::Memory, Connection::open_in_memory);
    }
    open_with(OpenMode::File, || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(OpenMode::Memory, Connection::open_in_memory).map(|opened| opened.connection)
}

fn open_with(
    mode: OpenMode,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<OpenedDb> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode={}",
        mode.as_str()
    );

    let mut conn = connect().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
            mode.as_str(),
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;

    let previous_version = match bootstrap_connection(&mut conn, mode) {
        Ok(version) => version,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode.as_str(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }
    };
    let created = previous_version == 0;

    info!(
        "event=db_open module=db status=ok mode={} created={} duration_ms={}",
        mode.as_str(),
        created,
        started_at.elapsed().as_millis()
    );
    Ok(OpenedDb {
        connection: conn,
        created,
    })
}

fn bootstrap_connection(conn: &mut Connection, mode: OpenMode) -> DbResult<u32> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if mode == OpenMode::File {
        // journal_mode answers with the active mode, so it has to be read back.
        let _: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    }
    apply_migrations(conn)
}
