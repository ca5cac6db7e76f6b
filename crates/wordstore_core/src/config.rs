//! Host-supplied construction config for the word repository.
//!
//! # Responsibility
//! - Carry storage path, worker pool size and seeding policy.
//! - Reject unusable values before anything is opened.
//!
//! # Invariants
//! - `pool_size >= 1`.
//! - Seeding never happens unless `seed_on_empty` is set explicitly.

use crate::db::IN_MEMORY_PATH;
use crate::model::word::validate_word_text;
use crate::repo::word_store::ConflictPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default worker pool size.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Words written by the seed job when none are configured.
pub const DEFAULT_SEED_WORDS: [&str; 2] = ["Hello", "World"];

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid config `{}`: {}", self.field, self.reason)
    }
}

impl Error for ConfigError {}

/// Construction config for [`crate::WordRepository`].
///
/// Deserializes with defaults for every missing field, so hosts may embed
/// it in their own config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Database file path, or `:memory:` for a private in-memory database.
    pub storage_path: String,
    /// Number of worker threads available for durable writes.
    pub pool_size: usize,
    /// Seed `seed_words` when the store is empty at construction.
    pub seed_on_empty: bool,
    pub seed_words: Vec<String>,
    pub conflict_policy: ConflictPolicy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            storage_path: IN_MEMORY_PATH.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            seed_on_empty: false,
            seed_words: DEFAULT_SEED_WORDS.iter().map(|word| word.to_string()).collect(),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl RepositoryConfig {
    pub fn new(storage_path: impl Into<String>) -> Self {
        Self {
            storage_path: storage_path.into(),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_seed_on_empty(mut self, seed_on_empty: bool) -> Self {
        self.seed_on_empty = seed_on_empty;
        self
    }

    pub fn with_seed_words<I, W>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        self.seed_words = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conflict_policy(mut self, conflict_policy: ConflictPolicy) -> Self {
        self.conflict_policy = conflict_policy;
        self
    }

    /// Checks every field; the first violation wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.trim().is_empty() {
            return Err(ConfigError {
                field: "storage_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.pool_size == 0 {
            return Err(ConfigError {
                field: "pool_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.seed_on_empty {
            if let Some(position) = self
                .seed_words
                .iter()
                .position(|word| validate_word_text(word).is_err())
            {
                return Err(ConfigError {
                    field: "seed_words",
                    reason: format!("entry {position} is empty"),
                });
            }
        }
        Ok(())
    }
}
