//! Process-wide word repository.
//!
//! # Invariants
//! - At most one shared repository exists per process.
//! - Initialization is idempotent for an identical config.
//! - Re-initialization with a different config is rejected.

use crate::config::RepositoryConfig;
use crate::service::word_repository::{RepositoryError, RepositoryResult, WordRepository};
use once_cell::sync::OnceCell;

static SHARED_REPOSITORY: OnceCell<WordRepository> = OnceCell::new();

/// Opens the shared repository once, or returns the existing one.
///
/// # Errors
/// - `AlreadyInitialized` when a repository with another config exists.
/// - Any error from [`WordRepository::open`] on first initialization; a
///   failed attempt leaves the slot empty so it can be retried.
pub fn init_shared_repository(
    config: RepositoryConfig,
) -> RepositoryResult<&'static WordRepository> {
    let repository = match SHARED_REPOSITORY.get() {
        Some(active) => active,
        None => SHARED_REPOSITORY.get_or_try_init(|| WordRepository::open(config.clone()))?,
    };

    if repository.config() != &config {
        return Err(RepositoryError::AlreadyInitialized {
            storage_path: repository.config().storage_path.clone(),
        });
    }
    Ok(repository)
}

/// Returns the shared repository.
///
/// # Errors
/// - `NotInitialized` before [`init_shared_repository`] succeeded.
pub fn shared_repository() -> RepositoryResult<&'static WordRepository> {
    SHARED_REPOSITORY
        .get()
        .ok_or(RepositoryError::NotInitialized)
}
