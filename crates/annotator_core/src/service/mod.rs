//! Annotation use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into load/list/save/delete/export use-cases.
//! - Keep the HTTP layer decoupled from storage and validation details.

pub mod annotation_service;
pub mod export_service;
