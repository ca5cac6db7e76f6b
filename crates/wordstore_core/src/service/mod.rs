//! Change-notifying services over the word store.
//!
//! # Responsibility
//! - Move durable writes off the calling thread onto a bounded pool.
//! - Keep subscribers decoupled from storage and threading details.

pub mod shared;
pub mod word_repository;
pub mod worker_pool;
