//! Change-notifying word repository.
//!
//! # Responsibility
//! - Serialize every mutation onto the worker pool in submission order.
//! - Publish a fresh ordered snapshot after each mutation that changed data.
//! - Hand out subscriptions that always start from the current snapshot.
//!
//! # Invariants
//! - Exactly one mutation per repository runs at a time, in FIFO order.
//! - The follow-up scan runs on the worker that applied the mutation, so a
//!   snapshot reflects that mutation and nothing submitted later.
//! - Failed mutations never publish.
//! - Published revisions strictly increase.
//!
//! # Delivery policy
//! Subscriptions are buffer-latest: each keeps only the newest unseen
//! snapshot, so a slow subscriber may skip intermediate snapshots of a burst
//! but always observes the last one. Publishing never waits on subscribers.

use crate::config::{ConfigError, RepositoryConfig};
use crate::model::snapshot::Snapshot;
use crate::model::word::{validate_word_text, Word, WordValidationError};
use crate::repo::word_store::{SqliteWordStore, StoreError, WordStore};
use crate::service::worker_pool::WorkerPool;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Error surfaced by repository operations.
#[derive(Debug)]
pub enum RepositoryError {
    /// Caller input was rejected before any I/O.
    Validation(WordValidationError),
    /// The backing store failed; no snapshot was published.
    Storage(StoreError),
    /// The mutation committed, but reading the follow-up snapshot failed.
    /// Subscribers catch up with the next successful publish.
    Publish(StoreError),
    /// The shared repository was requested before initialization.
    NotInitialized,
    /// The shared repository exists with a different config.
    AlreadyInitialized { storage_path: String },
    InvalidConfig(ConfigError),
    /// The worker pool could not be started.
    WorkerPool(io::Error),
    /// The dispatcher stopped before the command completed.
    Closed,
}

impl Display for RepositoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "word storage failed: {err}"),
            Self::Publish(err) => write!(f, "change saved but snapshot refresh failed: {err}"),
            Self::NotInitialized => write!(f, "word repository is not initialized"),
            Self::AlreadyInitialized { storage_path } => write!(
                f,
                "word repository already initialized at `{storage_path}` with a different config"
            ),
            Self::InvalidConfig(err) => write!(f, "{err}"),
            Self::WorkerPool(err) => write!(f, "failed to start worker pool: {err}"),
            Self::Closed => write!(f, "word repository dispatcher is closed"),
        }
    }
}

impl Error for RepositoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) | Self::Publish(err) => Some(err),
            Self::InvalidConfig(err) => Some(err),
            Self::WorkerPool(err) => Some(err),
            Self::NotInitialized | Self::AlreadyInitialized { .. } | Self::Closed => None,
        }
    }
}

impl From<WordValidationError> for RepositoryError {
    fn from(value: WordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepositoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Storage(other),
        }
    }
}

impl From<ConfigError> for RepositoryError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}

type Reply<T> = oneshot::Sender<RepositoryResult<T>>;

enum Command {
    Insert { text: String, reply: Reply<Word> },
    DeleteAll { reply: Reply<()> },
    Seed { words: Vec<String>, reply: Reply<()> },
    Flush { reply: Reply<()> },
}

/// Completion handle for a queued mutation.
///
/// Dropping it abandons interest in the result; the mutation itself still
/// runs to completion.
#[must_use = "dropping a PendingWrite ignores the mutation result"]
#[derive(Debug)]
pub struct PendingWrite<T> {
    receiver: oneshot::Receiver<RepositoryResult<T>>,
}

impl<T> PendingWrite<T> {
    /// Blocks the current thread until the mutation finished.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`PendingWrite::completion`] there.
    pub fn wait(self) -> RepositoryResult<T> {
        self.receiver
            .blocking_recv()
            .map_err(|_| RepositoryError::Closed)?
    }

    /// Resolves once the mutation finished.
    pub async fn completion(self) -> RepositoryResult<T> {
        self.receiver.await.map_err(|_| RepositoryError::Closed)?
    }
}

/// Stream of snapshots for one subscriber.
///
/// The first item is the snapshot current at subscription time.
#[derive(Debug)]
pub struct SnapshotSubscription {
    receiver: watch::Receiver<Snapshot>,
    initial: Option<Snapshot>,
    delivered: u64,
}

impl SnapshotSubscription {
    /// Newest published snapshot, without consuming it.
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the repository is gone and every snapshot has
    /// been delivered.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        if self.receiver.changed().await.is_err() {
            return self.undelivered();
        }
        Some(self.deliver())
    }

    /// Returns the next snapshot if one is ready, without waiting.
    ///
    /// After the repository is gone this still yields the final snapshot
    /// once, if it was not delivered yet.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        match self.receiver.has_changed() {
            Ok(true) => Some(self.deliver()),
            Ok(false) => None,
            Err(_) => self.undelivered(),
        }
    }

    fn deliver(&mut self) -> Snapshot {
        let snapshot = self.receiver.borrow_and_update().clone();
        self.delivered = snapshot.revision();
        snapshot
    }

    // `has_changed` reports a closed channel before the unseen value.
    fn undelivered(&mut self) -> Option<Snapshot> {
        let pending = self.receiver.borrow().revision() > self.delivered;
        pending.then(|| self.deliver())
    }
}

/// Word repository that serializes writes and publishes snapshots.
///
/// Dropping the repository closes its command queue and blocks until every
/// command accepted before the drop has been applied.
pub struct WordRepository<S: WordStore + 'static = SqliteWordStore> {
    store: Arc<S>,
    commands: Option<mpsc::UnboundedSender<Command>>,
    snapshots: watch::Receiver<Snapshot>,
    config: RepositoryConfig,
    initial_seed: Mutex<Option<PendingWrite<()>>>,
    // Disconnects when the dispatcher returns.
    dispatcher_done: Mutex<std_mpsc::Receiver<()>>,
    _pool: Arc<WorkerPool>,
}

impl WordRepository<SqliteWordStore> {
    /// Opens the SQLite store named by `config` on a dedicated worker pool.
    ///
    /// # Side effects
    /// - Creates and migrates the database when needed.
    /// - Queues the seed job when `seed_on_empty` is set and this open
    ///   created the database.
    pub fn open(config: RepositoryConfig) -> RepositoryResult<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.pool_size).map_err(RepositoryError::WorkerPool)?;
        let store = SqliteWordStore::open(&config.storage_path, config.conflict_policy)?;
        Self::with_store(Arc::new(store), Arc::new(pool), config)
    }
}

impl<S: WordStore + 'static> WordRepository<S> {
    /// Builds a repository over an existing store and pool.
    ///
    /// `config.storage_path`, `pool_size` and `conflict_policy` are
    /// informational here; the store and pool are used as given.
    pub fn with_store(
        store: Arc<S>,
        pool: Arc<WorkerPool>,
        config: RepositoryConfig,
    ) -> RepositoryResult<Self> {
        config.validate()?;

        let initial = Snapshot::new(0, store.scan_ordered()?);
        let seed_needed = config.seed_on_empty && store.newly_created() && initial.is_empty();
        info!(
            "event=repo_open module=service status=ok words={} seed={}",
            initial.len(),
            seed_needed
        );

        let (publisher, snapshots) = watch::channel(initial);
        let (commands, queue) = mpsc::unbounded_channel();
        let (done, dispatcher_done) = std_mpsc::channel();
        pool.spawn(run_dispatcher(
            Arc::clone(&store),
            Arc::new(publisher),
            queue,
            done,
        ));

        let repository = Self {
            store,
            commands: Some(commands),
            snapshots,
            config,
            initial_seed: Mutex::new(None),
            dispatcher_done: Mutex::new(dispatcher_done),
            _pool: pool,
        };

        if seed_needed {
            let seed = repository.seed(repository.config.seed_words.clone())?;
            if let Ok(mut slot) = repository.initial_seed.lock() {
                *slot = Some(seed);
            }
        }

        Ok(repository)
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Takes the completion handle of the seed job queued by construction.
    ///
    /// Returns `None` when no seed was queued or the handle was already
    /// taken.
    pub fn take_initial_seed(&self) -> Option<PendingWrite<()>> {
        self.initial_seed.lock().ok()?.take()
    }

    /// Subscribes to snapshot updates, starting with the current snapshot.
    pub fn subscribe(&self) -> SnapshotSubscription {
        let mut receiver = self.snapshots.clone();
        let initial = receiver.borrow_and_update().clone();
        SnapshotSubscription {
            receiver,
            delivered: initial.revision(),
            initial: Some(initial),
        }
    }

    /// Most recently published snapshot. Never touches the store.
    pub fn current_snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Queues an insert of `text`.
    ///
    /// Empty text is rejected here, before anything is queued. Under the
    /// `Ignore` conflict policy an existing identical word is returned and
    /// no snapshot is published.
    pub fn insert(&self, text: impl Into<String>) -> RepositoryResult<PendingWrite<Word>> {
        let text = text.into();
        if let Err(err) = validate_word_text(&text) {
            warn!("event=word_insert module=service status=rejected error={err}");
            return Err(err.into());
        }
        self.submit(|reply| Command::Insert { text, reply })
    }

    /// Queues removal of every word. Ids are not reset.
    pub fn delete_all(&self) -> RepositoryResult<PendingWrite<()>> {
        self.submit(|reply| Command::DeleteAll { reply })
    }

    /// Queues delete-all followed by inserting `words`, as one job with one
    /// published snapshot.
    pub fn seed<I, W>(&self, words: I) -> RepositoryResult<PendingWrite<()>>
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        let words = words.into_iter().map(Into::into).collect::<Vec<String>>();
        for word in &words {
            validate_word_text(word)?;
        }
        self.submit(|reply| Command::Seed { words, reply })
    }

    /// Resolves once every mutation queued before it has been applied.
    pub fn flush(&self) -> RepositoryResult<PendingWrite<()>> {
        self.submit(|reply| Command::Flush { reply })
    }

    /// Reads the store directly on the calling thread.
    ///
    /// Safe alongside an in-flight write; may be newer than the cached
    /// snapshot.
    pub fn scan_ordered(&self) -> RepositoryResult<Vec<Word>> {
        Ok(self.store.scan_ordered()?)
    }

    /// Number of persisted words, read on the calling thread.
    pub fn count(&self) -> RepositoryResult<u64> {
        Ok(self.store.count()?)
    }

    fn submit<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> RepositoryResult<PendingWrite<T>> {
        let (reply, receiver) = oneshot::channel();
        self.commands
            .as_ref()
            .ok_or(RepositoryError::Closed)?
            .send(build(reply))
            .map_err(|_| RepositoryError::Closed)?;
        Ok(PendingWrite { receiver })
    }
}

impl<S: WordStore + 'static> Drop for WordRepository<S> {
    fn drop(&mut self) {
        // Closing the queue lets the dispatcher finish what was accepted.
        drop(self.commands.take());
        if let Ok(done) = self.dispatcher_done.get_mut() {
            let _ = done.recv();
        }
        debug!("event=repo_close module=service status=ok");
    }
}

async fn run_dispatcher<S: WordStore + 'static>(
    store: Arc<S>,
    publisher: Arc<watch::Sender<Snapshot>>,
    mut queue: mpsc::UnboundedReceiver<Command>,
    _done: std_mpsc::Sender<()>,
) {
    while let Some(command) = queue.recv().await {
        let store = Arc::clone(&store);
        let publisher = Arc::clone(&publisher);
        let job = task::spawn_blocking(move || execute(store.as_ref(), &publisher, command));
        if let Err(err) = job.await {
            error!(
                "event=worker_job module=service status=error error_code=job_aborted error={err}"
            );
        }
    }
    debug!("event=dispatcher_stop module=service status=ok");
}

fn execute<S: WordStore + ?Sized>(
    store: &S,
    publisher: &watch::Sender<Snapshot>,
    command: Command,
) {
    match command {
        Command::Insert { text, reply } => {
            let result = store
                .insert_word(&text)
                .map_err(RepositoryError::from)
                .and_then(|outcome| {
                    if outcome.is_inserted() {
                        publish(store, publisher)?;
                    } else {
                        debug!(
                            "event=word_insert module=service status=skipped reason=duplicate id={}",
                            outcome.word().id
                        );
                    }
                    Ok(outcome.into_word())
                });
            if let Ok(word) = &result {
                debug!(
                    "event=word_insert module=service status=ok id={} text_len={}",
                    word.id,
                    word.text.chars().count()
                );
            }
            finish("word_insert", reply, result);
        }
        Command::DeleteAll { reply } => {
            let result = store
                .delete_all()
                .map_err(RepositoryError::from)
                .and_then(|removed| {
                    debug!("event=word_delete_all module=service status=ok removed={removed}");
                    if removed > 0 {
                        publish(store, publisher)?;
                    }
                    Ok(())
                });
            finish("word_delete_all", reply, result);
        }
        Command::Seed { words, reply } => {
            let result = seed_words(store, publisher, &words);
            if result.is_ok() {
                info!(
                    "event=word_seed module=service status=ok words={}",
                    words.len()
                );
            }
            finish("word_seed", reply, result);
        }
        Command::Flush { reply } => {
            let _ = reply.send(Ok(()));
        }
    }
}

fn seed_words<S: WordStore + ?Sized>(
    store: &S,
    publisher: &watch::Sender<Snapshot>,
    words: &[String],
) -> RepositoryResult<()> {
    let mut changed = false;
    let mut outcome = store.delete_all().map(|removed| changed |= removed > 0);
    for word in words {
        if outcome.is_err() {
            break;
        }
        outcome = store
            .insert_word(word)
            .map(|inserted| changed |= inserted.is_inserted());
    }

    // Steps that committed before a failure are still visible to readers.
    if changed {
        publish(store, publisher)?;
    }
    outcome.map_err(RepositoryError::from)
}

fn publish<S: WordStore + ?Sized>(
    store: &S,
    publisher: &watch::Sender<Snapshot>,
) -> RepositoryResult<()> {
    let words = store.scan_ordered().map_err(RepositoryError::Publish)?;
    let snapshot = publisher.borrow().next(words);
    let revision = snapshot.revision();
    let len = snapshot.len();
    publisher.send_replace(snapshot);
    debug!("event=snapshot_publish module=service status=ok revision={revision} words={len}");
    Ok(())
}

fn finish<T>(event: &str, reply: Reply<T>, result: RepositoryResult<T>) {
    if let Err(err) = &result {
        error!("event={event} module=service status=error error={err}");
    }
    // The caller may have dropped its PendingWrite.
    let _ = reply.send(result);
}

#[cfg(test)]
mod tests {
    use super::RepositoryError;
    use crate::model::word::WordValidationError;
    use crate::repo::word_store::StoreError;

    #[test]
    fn store_validation_maps_to_repository_validation() {
        let err = RepositoryError::from(StoreError::Validation(WordValidationError::EmptyText));
        assert!(matches!(
            err,
            RepositoryError::Validation(WordValidationError::EmptyText)
        ));
    }

    #[test]
    fn store_failures_map_to_storage() {
        let err = RepositoryError::from(StoreError::LockPoisoned("writer"));
        assert!(matches!(err, RepositoryError::Storage(_)));
        assert!(err.to_string().contains("writer connection lock poisoned"));
    }
}
