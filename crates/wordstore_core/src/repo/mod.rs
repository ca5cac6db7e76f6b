//! Record store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the minimal query surface over `word_table`.
//! - Isolate SQLite details from the notifying repository.
//!
//! # Invariants
//! - Write paths validate text before any SQL runs.
//! - Every write is atomic with respect to the backing database.

pub mod word_store;
