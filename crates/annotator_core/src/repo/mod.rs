//! Repository layer over the `annotation` table.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Every mutation runs in a transaction scoped to its single statement.
//! - Mutations addressing an unknown `unique_id` return `NotFound`.

pub mod annotation_repo;
