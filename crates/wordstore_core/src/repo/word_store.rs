//! Word record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert, delete-all and ordered scan over `word_table`.
//! - Apply the duplicate-text conflict policy inside the write transaction.
//!
//! # Invariants
//! - Ids come from `AUTOINCREMENT` and are never reused.
//! - Scans are ordered by `word ASC, id ASC`.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::{is_in_memory_path, open_db, open_db_tracked, DbError, IN_MEMORY_PATH};
use crate::model::word::{validate_word_text, Word, WordId, WordValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const WORD_SELECT_SQL: &str = "SELECT id, word FROM word_table";

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for word persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    Validation(WordValidationError),
    Db(DbError),
    InvalidData(String),
    /// A thread panicked while holding a connection.
    LockPoisoned(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted word data: {message}"),
            Self::LockPoisoned(which) => write!(f, "{which} connection lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::LockPoisoned(_) => None,
        }
    }
}

impl From<WordValidationError> for StoreError {
    fn from(value: WordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rule applied when an insert would duplicate an existing text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the existing record and report its identity.
    #[default]
    Ignore,
    /// Store duplicates as separate records.
    Allow,
}

/// Result of an insert under the active conflict policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was written.
    Inserted(Word),
    /// An identical text already existed; nothing was written.
    Existing(Word),
}

impl InsertOutcome {
    pub fn word(&self) -> &Word {
        match self {
            Self::Inserted(word) | Self::Existing(word) => word,
        }
    }

    pub fn into_word(self) -> Word {
        match self {
            Self::Inserted(word) | Self::Existing(word) => word,
        }
    }

    /// Whether the store contents changed.
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Store interface for word records.
///
/// Implementations must be shareable across worker threads.
pub trait WordStore: Send + Sync {
    fn insert_word(&self, text: &str) -> StoreResult<InsertOutcome>;
    /// Removes every word and returns how many rows were removed.
    fn delete_all(&self) -> StoreResult<usize>;
    fn scan_ordered(&self) -> StoreResult<Vec<Word>>;
    fn count(&self) -> StoreResult<u64>;

    /// Whether opening this store created its schema from scratch.
    fn newly_created(&self) -> bool {
        false
    }
}

/// SQLite-backed word store.
///
/// File databases get a dedicated reader connection so scans issued outside
/// the mutation path never wait behind the writer's lock. In-memory
/// databases are private to one connection and share it.
pub struct SqliteWordStore {
    writer: Mutex<Connection>,
    reader: Option<Mutex<Connection>>,
    conflict_policy: ConflictPolicy,
    created: bool,
}

impl SqliteWordStore {
    /// Opens (or creates) the store at `path`; `:memory:` selects memory.
    pub fn open(path: impl AsRef<Path>, conflict_policy: ConflictPolicy) -> StoreResult<Self> {
        let path = path.as_ref();
        if is_in_memory_path(path) {
            return Self::open_in_memory(conflict_policy);
        }

        // The writer opens first so it alone observes a fresh schema.
        let writer = open_db_tracked(path)?;
        let reader = open_db(path)?;
        Ok(Self {
            writer: Mutex::new(writer.connection),
            reader: Some(Mutex::new(reader)),
            conflict_policy,
            created: writer.created,
        })
    }

    /// Opens a private in-memory store; it always counts as newly created.
    pub fn open_in_memory(conflict_policy: ConflictPolicy) -> StoreResult<Self> {
        let opened = open_db_tracked(IN_MEMORY_PATH)?;
        Ok(Self {
            writer: Mutex::new(opened.connection),
            reader: None,
            conflict_policy,
            created: opened.created,
        })
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, conflict_policy: ConflictPolicy) -> Self {
        Self {
            writer: Mutex::new(conn),
            reader: None,
            conflict_policy,
            created: false,
        }
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    fn lock_writer(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::LockPoisoned("writer"))
    }

    fn lock_reader(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        match &self.reader {
            Some(reader) => reader
                .lock()
                .map_err(|_| StoreError::LockPoisoned("reader")),
            None => self.lock_writer(),
        }
    }
}

impl WordStore for SqliteWordStore {
    fn insert_word(&self, text: &str) -> StoreResult<InsertOutcome> {
        validate_word_text(text)?;

        let mut conn = self.lock_writer()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if self.conflict_policy == ConflictPolicy::Ignore {
            let existing = tx
                .query_row(
                    &format!("{WORD_SELECT_SQL} WHERE word = ?1 ORDER BY id ASC LIMIT 1;"),
                    [text],
                    |row| Ok((row.get::<_, WordId>("id")?, row.get::<_, String>("word")?)),
                )
                .optional()?;
            if let Some((id, word)) = existing {
                tx.commit()?;
                return Ok(InsertOutcome::Existing(build_word(id, word)?));
            }
        }

        tx.execute("INSERT INTO word_table (word) VALUES (?1);", params![text])?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(InsertOutcome::Inserted(Word {
            id,
            text: text.to_string(),
        }))
    }

    fn delete_all(&self) -> StoreResult<usize> {
        let mut conn = self.lock_writer()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM word_table;", [])?;
        tx.commit()?;
        Ok(removed)
    }

    fn scan_ordered(&self) -> StoreResult<Vec<Word>> {
        let conn = self.lock_reader()?;
        let mut stmt =
            conn.prepare_cached(&format!("{WORD_SELECT_SQL} ORDER BY word ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut words = Vec::new();

        while let Some(row) = rows.next()? {
            words.push(parse_word_row(row)?);
        }

        Ok(words)
    }

    fn count(&self) -> StoreResult<u64> {
        let conn = self.lock_reader()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM word_table;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative row count `{count}`")))
    }

    fn newly_created(&self) -> bool {
        self.created
    }
}

fn parse_word_row(row: &Row<'_>) -> StoreResult<Word> {
    build_word(row.get("id")?, row.get("word")?)
}

fn build_word(id: WordId, text: String) -> StoreResult<Word> {
    Word::new(id, text)
        .map_err(|err| StoreError::InvalidData(format!("word_table row {id}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{ConflictPolicy, InsertOutcome, SqliteWordStore, WordStore};

    #[test]
    fn existing_outcome_reports_first_matching_id() {
        let store = SqliteWordStore::open_in_memory(ConflictPolicy::Ignore).unwrap();
        let first = store.insert_word("echo").unwrap();
        let second = store.insert_word("echo").unwrap();

        assert!(first.is_inserted());
        assert_eq!(second, InsertOutcome::Existing(first.into_word()));
    }

    #[test]
    fn only_the_first_open_of_a_file_counts_as_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("created.db");

        let first = SqliteWordStore::open(&path, ConflictPolicy::Ignore).unwrap();
        assert!(first.newly_created());
        drop(first);

        let second = SqliteWordStore::open(&path, ConflictPolicy::Ignore).unwrap();
        assert!(!second.newly_created());
        assert!(SqliteWordStore::open_in_memory(ConflictPolicy::Ignore)
            .unwrap()
            .newly_created());
    }

    #[test]
    fn count_tracks_inserts_and_delete_all() {
        let store = SqliteWordStore::open_in_memory(ConflictPolicy::Allow).unwrap();
        store.insert_word("a").unwrap();
        store.insert_word("a").unwrap();
        assert_eq!(store.count().unwrap(), 2);

        assert_eq!(store.delete_all().unwrap(), 2);
        assert_eq!(store.count().unwrap(), 0);
    }
}
