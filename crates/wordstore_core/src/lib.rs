//! Embedded, ordered word store with change notification.
//!
//! Layers, leaf first: `db` (SQLite bootstrap) → `repo` (record store) →
//! `service` (serialized writes and snapshot publishing).

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, RepositoryConfig, DEFAULT_POOL_SIZE, DEFAULT_SEED_WORDS};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::snapshot::Snapshot;
pub use model::word::{validate_word_text, Word, WordId, WordValidationError};
pub use repo::word_store::{
    ConflictPolicy, InsertOutcome, SqliteWordStore, StoreError, StoreResult, WordStore,
};
pub use service::shared::{init_shared_repository, shared_repository};
pub use service::word_repository::{
    PendingWrite, RepositoryError, RepositoryResult, SnapshotSubscription, WordRepository,
};
pub use service::worker_pool::WorkerPool;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
