//! Domain model for the word list.
//!
//! # Responsibility
//! - Define the persisted `Word` record and its validation rules.
//! - Define the immutable `Snapshot` handed to subscribers.
//!
//! # Invariants
//! - Every persisted word is identified by a store-assigned `WordId`.
//! - Snapshots are never mutated after construction.

pub mod snapshot;
pub mod word;
