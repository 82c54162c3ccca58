//! Training dataset export.
//!
//! # Responsibility
//! - Batch persisted annotations into timestamped dataset files.
//! - Hand BILUO batches to the external converter.
//!
//! # Invariants
//! - Records are exported in table order.
//! - BILUO documents are renumbered `0..N-1`; span-tuple payloads are written
//!   exactly as stored.
//! - The whole table is read into memory; there is no streaming.

use crate::convert::{ConvertError, Converter};
use crate::model::record::{ExportKind, UniqueId};
use crate::repo::annotation_repo::{AnnotationColumn, AnnotationRepository, RepoError};
use crate::validation::with_document_id;
use chrono::NaiveDateTime;
use log::info;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug)]
pub enum ExportError {
    Repo(RepoError),
    /// Stored annotation text is not valid JSON.
    CorruptAnnotation {
        unique_id: UniqueId,
        source: serde_json::Error,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Conversion(ConvertError),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::CorruptAnnotation { unique_id, source } => {
                write!(f, "stored annotation of {unique_id} is not valid json: {source}")
            }
            Self::Io { path, source } => {
                write!(f, "failed to write dataset `{}`: {source}", path.display())
            }
            Self::Conversion(err) => write!(f, "dataset conversion failed: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::CorruptAnnotation { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Conversion(err) => Some(err),
        }
    }
}

impl From<RepoError> for ExportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Result of one export call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub dataset_path: PathBuf,
    pub records: usize,
    /// Whether the converter ran for this dataset.
    pub converted: bool,
}

/// Dataset file stem: local time to whole seconds, `:` and space as `_`.
pub fn dataset_stem(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%d_%H_%M_%S").to_string()
}

/// Export use-case over an annotation repository.
pub struct ExportService<'c, R: AnnotationRepository> {
    repo: R,
    input_dir: PathBuf,
    output_dir: PathBuf,
    converter: Option<&'c dyn Converter>,
}

impl<'c, R: AnnotationRepository> ExportService<'c, R> {
    /// `input_dir` receives JSON datasets, `output_dir` converter output.
    pub fn new(
        repo: R,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        converter: Option<&'c dyn Converter>,
    ) -> Self {
        Self {
            repo,
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            converter,
        }
    }

    /// Writes the dataset for `kind`, stamped with `now`.
    pub fn export_dataset(&self, kind: ExportKind, now: NaiveDateTime) -> ExportResult<ExportReport> {
        let stem = dataset_stem(now);
        match kind {
            ExportKind::Biluo => self.export_biluo(&stem),
            ExportKind::SpanTuple => self.export_span_tuples(&stem),
        }
    }

    fn export_biluo(&self, stem: &str) -> ExportResult<ExportReport> {
        let documents = self
            .load_documents(AnnotationColumn::Biluo)?
            .iter()
            .enumerate()
            .map(|(id, document)| with_document_id(document, id))
            .collect::<Vec<_>>();

        let dataset_path = self.input_dir.join(format!("{stem}_BILUO.json"));
        write_dataset(&dataset_path, &documents)?;

        let converted = match self.converter {
            Some(converter) => {
                create_dir(&self.output_dir)?;
                converter
                    .convert(&dataset_path, &self.output_dir)
                    .map_err(ExportError::Conversion)?;
                true
            }
            None => false,
        };

        info!(
            "event=dataset_export module=service status=ok kind=biluo records={} converted={}",
            documents.len(),
            converted
        );
        Ok(ExportReport {
            dataset_path,
            records: documents.len(),
            converted,
        })
    }

    fn export_span_tuples(&self, stem: &str) -> ExportResult<ExportReport> {
        let payloads = self.load_documents(AnnotationColumn::NonBiluo)?;
        let dataset_path = self.input_dir.join(format!("{stem}.json"));
        write_dataset(&dataset_path, &payloads)?;

        info!(
            "event=dataset_export module=service status=ok kind=span_tuple records={}",
            payloads.len()
        );
        Ok(ExportReport {
            dataset_path,
            records: payloads.len(),
            converted: false,
        })
    }

    fn load_documents(&self, column: AnnotationColumn) -> ExportResult<Vec<Value>> {
        self.repo
            .annotations(column)?
            .into_iter()
            .map(|annotation| {
                serde_json::from_str(&annotation.payload).map_err(|err| {
                    ExportError::CorruptAnnotation {
                        unique_id: annotation.unique_id,
                        source: err,
                    }
                })
            })
            .collect()
    }
}

fn write_dataset(path: &Path, documents: &[Value]) -> ExportResult<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    let bytes = serde_json::to_vec(documents).map_err(|err| ExportError::Io {
        path: path.to_path_buf(),
        source: err.into(),
    })?;
    std::fs::write(path, bytes).map_err(|err| ExportError::Io {
        path: path.to_path_buf(),
        source: err,
    })
}

fn create_dir(dir: &Path) -> ExportResult<()> {
    std::fs::create_dir_all(dir).map_err(|err| ExportError::Io {
        path: dir.to_path_buf(),
        source: err,
    })
}
