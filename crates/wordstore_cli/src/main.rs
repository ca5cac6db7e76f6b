//! CLI host for the word store.
//!
//! # Responsibility
//! - Exercise `wordstore_core` end to end from a plain process.
//! - Print the ordered word list so runs are easy to compare.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use wordstore_core::{init_logging, ConflictPolicy, RepositoryConfig, WordRepository};

#[derive(Debug, Parser)]
#[command(name = "wordstore", version, about = "Insert words and print the ordered list")]
struct Cli {
    /// Database file, or `:memory:`.
    #[arg(long, default_value = "wordstore.db")]
    db: String,

    /// Seed the sample words when the store is empty.
    #[arg(long)]
    seed: bool,

    /// Remove every word before inserting.
    #[arg(long)]
    clear: bool,

    /// Keep duplicate words instead of ignoring them.
    #[arg(long)]
    allow_duplicates: bool,

    #[arg(long, default_value_t = wordstore_core::DEFAULT_POOL_SIZE)]
    pool_size: usize,

    /// Absolute directory for rolling log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Words to insert, in order.
    words: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let log_dir = log_dir.to_str().context("log dir must be valid UTF-8")?;
        init_logging(wordstore_core::default_log_level(), log_dir)?;
    }

    let conflict_policy = if cli.allow_duplicates {
        ConflictPolicy::Allow
    } else {
        ConflictPolicy::Ignore
    };
    let config = RepositoryConfig::new(cli.db.as_str())
        .with_pool_size(cli.pool_size)
        .with_seed_on_empty(cli.seed)
        .with_conflict_policy(conflict_policy);
    let repository = WordRepository::open(config)
        .with_context(|| format!("failed to open word store `{}`", cli.db))?;
    if let Some(seed) = repository.take_initial_seed() {
        seed.wait().context("failed to seed sample words")?;
    }

    if cli.clear {
        repository.delete_all()?.wait()?;
    }
    for word in &cli.words {
        match repository.insert(word.as_str()) {
            Ok(pending) => {
                let stored = pending.wait()?;
                println!("saved id={} word={}", stored.id, stored.text);
            }
            Err(err) => eprintln!("not saved: {err}"),
        }
    }
    repository.flush()?.wait()?;

    let snapshot = repository.current_snapshot();
    println!("revision={} words={}", snapshot.revision(), snapshot.len());
    for word in snapshot.iter() {
        println!("{:>6}  {}", word.id, word.text);
    }
    Ok(())
}
