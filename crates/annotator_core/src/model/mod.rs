//! Domain model for annotation records and client payloads.
//!
//! # Responsibility
//! - Define the record shape shared by repository, services and HTTP surface.
//! - Define exhaustive operation kinds decoded from wire integers.
//!
//! # Invariants
//! - Every record is identified by a stable, opaque `UniqueId`.
//! - Unknown operation kinds are rejected, never defaulted.

pub mod payload;
pub mod record;
