//! BILUO payload validation run before a save.
//!
//! # Responsibility
//! - Define the `BiluoValidator` seam used by the save use-case.
//! - Provide the in-process grammar check and the legacy converter round-trip.
//!
//! # Invariants
//! - Validators never mutate persisted state.
//! - Only the BILUO representation is validated; span tuples are trusted.

use crate::convert::ConvertError;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod converter;
mod schema;

pub use converter::ConverterValidator;
pub use schema::SchemaValidator;

pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Debug)]
pub enum ValidationError {
    /// Document violates the training shape or tag grammar at `path`.
    Invalid { path: String, reason: String },
    Converter(ConvertError),
    Io { path: PathBuf, source: std::io::Error },
}

impl ValidationError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { path, reason } => write!(f, "invalid BILUO document at {path}: {reason}"),
            Self::Converter(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "failed to write `{}`: {source}", path.display()),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid { .. } => None,
            Self::Converter(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Checks one BILUO training document.
pub trait BiluoValidator: Send + Sync {
    fn validate(&self, document: &Value) -> ValidationResult<()>;
}

/// Returns a copy of `document` with its batch sequence `id` set.
///
/// Non-object documents are returned unchanged.
pub fn with_document_id(document: &Value, id: usize) -> Value {
    let mut document = document.clone();
    if let Value::Object(fields) = &mut document {
        fields.insert("id".to_string(), Value::from(id));
    }
    document
}
