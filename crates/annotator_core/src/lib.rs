//! Core logic for the NER annotation backend.
//! This crate is the single source of truth for the annotation lifecycle.

pub mod convert;
pub mod db;
pub mod logging;
pub mod model;
pub mod ner;
pub mod repo;
pub mod service;
pub mod settings;
pub mod source;
pub mod validation;

pub use convert::{CommandConverter, ConvertError, ConvertResult, Converter};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::payload::{parse_payload, DeleteAnnotationRequest, PayloadError, SaveAnnotationRequest};
pub use model::record::{
    AnnotationRecord, DeleteKind, ExportKind, KindError, SourceField, UniqueId,
};
pub use ner::{CommandRecognizer, EntityRecognizer, NerError, NerResult};
pub use repo::annotation_repo::{
    AnnotationColumn, AnnotationRepository, NewRecord, RepoError, RepoResult,
    SqliteAnnotationRepository, StoredAnnotation,
};
pub use service::annotation_service::{AnnotationService, LoadReport, ServiceError, ServiceResult};
pub use service::export_service::{
    dataset_stem, ExportError, ExportReport, ExportResult, ExportService,
};
pub use settings::{Settings, SettingsError, ValidationMode};
pub use source::{ExcelSource, MemorySource, SourceError, SourceReader, SourceTable};
pub use validation::{
    BiluoValidator, ConverterValidator, SchemaValidator, ValidationError, ValidationResult,
};

/// Greeting served at the service root.
pub fn welcome() -> &'static str {
    "Welcome!"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
