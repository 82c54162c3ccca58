//! Annotation lifecycle service.
//!
//! # Responsibility
//! - Load source rows into the table with generated identifiers.
//! - Save both annotation representations after BILUO validation.
//! - Delete whole records or clear their annotations.
//!
//! # Invariants
//! - A rejected BILUO payload never reaches the repository.
//! - Loading is not idempotent: every call appends all source rows again.

use crate::model::record::{AnnotationRecord, DeleteKind, UniqueId};
use crate::repo::annotation_repo::{AnnotationRepository, NewRecord, RepoError};
use crate::source::{SourceError, SourceReader};
use crate::validation::{with_document_id, BiluoValidator, ValidationError};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for annotation use-cases.
#[derive(Debug)]
pub enum ServiceError {
    Source(SourceError),
    /// BILUO payload rejected; nothing was written.
    InvalidBiluo(ValidationError),
    RecordNotFound(UniqueId),
    Serialize(serde_json::Error),
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(err) => write!(f, "{err}"),
            Self::InvalidBiluo(err) => write!(f, "{err}"),
            Self::RecordNotFound(id) => write!(f, "annotation record not found: {id}"),
            Self::Serialize(err) => write!(f, "failed to serialize annotation: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            Self::InvalidBiluo(err) => Some(err),
            Self::RecordNotFound(_) => None,
            Self::Serialize(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(unique_id) => Self::RecordNotFound(unique_id),
            other => Self::Repo(other),
        }
    }
}

impl From<SourceError> for ServiceError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

/// Outcome of one load call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    pub columns: Vec<String>,
}

/// Use-case service over an annotation repository.
pub struct AnnotationService<'v, R: AnnotationRepository> {
    repo: R,
    validator: &'v dyn BiluoValidator,
}

impl<'v, R: AnnotationRepository> AnnotationService<'v, R> {
    pub fn new(repo: R, validator: &'v dyn BiluoValidator) -> Self {
        Self { repo, validator }
    }

    /// Returns whether the annotation table exists yet.
    pub fn is_initialized(&self) -> ServiceResult<bool> {
        Ok(self.repo.table_exists()?)
    }

    /// Reads the source, creates the table if needed and appends every row.
    ///
    /// # Contract
    /// - `use_cols` restricts and orders the imported columns; empty means all.
    /// - Each row receives a fresh UUIDv4 `unique_id`.
    /// - Rows are inserted in one transaction.
    pub fn load_source(
        &self,
        source: &dyn SourceReader,
        use_cols: &[String],
    ) -> ServiceResult<LoadReport> {
        let table = source.read()?.select(use_cols)?;
        self.repo.ensure_table(&table.columns)?;

        let records = table
            .rows
            .into_iter()
            .map(|values| NewRecord {
                unique_id: Uuid::new_v4().to_string(),
                values,
            })
            .collect::<Vec<_>>();
        let inserted = self.repo.insert_records(&table.columns, &records)?;

        info!(
            "event=db_load module=service status=ok inserted={} columns={}",
            inserted,
            table.columns.len()
        );
        Ok(LoadReport {
            inserted,
            columns: table.columns,
        })
    }

    /// Lists every record in table order.
    pub fn list_records(&self) -> ServiceResult<Vec<AnnotationRecord>> {
        Ok(self.repo.list_records()?)
    }

    pub fn get_record(&self, unique_id: &str) -> ServiceResult<Option<AnnotationRecord>> {
        Ok(self.repo.get_record(unique_id)?)
    }

    /// Validates the BILUO document and stores both representations.
    ///
    /// # Contract
    /// - Validation sees the document as the single member of a batch (`id = 0`).
    /// - Both payloads are stored as sent, serialized to JSON text.
    /// - On rejection the record is left untouched.
    pub fn save_annotation(
        &self,
        unique_id: &str,
        biluo: &Value,
        non_biluo: &Value,
    ) -> ServiceResult<()> {
        if let Err(err) = self.validator.validate(&with_document_id(biluo, 0)) {
            warn!(
                "event=annotation_save module=service status=rejected unique_id={} error={}",
                unique_id, err
            );
            return Err(ServiceError::InvalidBiluo(err));
        }

        let biluo_text = serde_json::to_string(biluo).map_err(ServiceError::Serialize)?;
        let non_biluo_text = serde_json::to_string(non_biluo).map_err(ServiceError::Serialize)?;
        self.repo
            .update_annotations(unique_id, &biluo_text, &non_biluo_text)?;

        info!(
            "event=annotation_save module=service status=ok unique_id={}",
            unique_id
        );
        Ok(())
    }

    /// Deletes a record or clears its annotations.
    pub fn delete_annotation(&self, unique_id: &str, kind: DeleteKind) -> ServiceResult<()> {
        match kind {
            DeleteKind::Record => self.repo.delete_record(unique_id)?,
            DeleteKind::Annotations => self.repo.clear_annotations(unique_id)?,
        }
        info!(
            "event=annotation_delete module=service status=ok unique_id={} kind={:?}",
            unique_id, kind
        );
        Ok(())
    }
}
