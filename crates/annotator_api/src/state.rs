//! Application state shared by HTTP handlers.
//!
//! # Responsibility
//! - Hold the single SQLite connection and the external collaborators.
//! - Build core services per call over the locked connection.
//!
//! # Invariants
//! - State is constructed explicitly and passed to the router; nothing is
//!   initialized at import time.
//! - Every database access goes through the connection mutex.

use annotator_core::{
    AnnotationService, BiluoValidator, CommandConverter, CommandRecognizer, Converter,
    ConverterValidator, EntityRecognizer, ExcelSource, ExportService, LoadReport,
    SchemaValidator, ServiceResult, Settings, SourceReader, SqliteAnnotationRepository,
    ValidationMode,
};
use log::info;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    source: Arc<dyn SourceReader + Send + Sync>,
    use_cols: Vec<String>,
    validator: Arc<dyn BiluoValidator>,
    converter: Option<Arc<dyn Converter>>,
    recognizer: Option<Arc<dyn EntityRecognizer>>,
    training_input: PathBuf,
    training_output: PathBuf,
}

impl AppState {
    /// Creates state with the in-process validator and no external tools.
    ///
    /// Datasets are written to the current directory until
    /// `with_training_dirs` says otherwise.
    pub fn new(conn: Connection, source: impl SourceReader + Send + Sync + 'static) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            source: Arc::new(source),
            use_cols: Vec::new(),
            validator: Arc::new(SchemaValidator),
            converter: None,
            recognizer: None,
            training_input: PathBuf::from("."),
            training_output: PathBuf::from("."),
        }
    }

    /// Wires state from settings: spreadsheet source, converter, validator
    /// mode and optional recognizer.
    pub fn from_settings(conn: Connection, settings: &Settings) -> Self {
        let converter = CommandConverter::from_command(&settings.converter_command)
            .map(|converter| Arc::new(converter) as Arc<dyn Converter>);
        let validator: Arc<dyn BiluoValidator> = match (settings.validation, &converter) {
            (ValidationMode::Converter, Some(converter)) => Arc::new(ConverterValidator::new(
                Arc::clone(converter),
                settings.temp_path(),
            )),
            _ => Arc::new(SchemaValidator),
        };
        let recognizer = settings
            .ner_command
            .as_deref()
            .and_then(CommandRecognizer::from_command)
            .map(|recognizer| Arc::new(recognizer) as Arc<dyn EntityRecognizer>);

        let mut state = Self::new(
            conn,
            ExcelSource::new(&settings.excel_data, &settings.sheet_name),
        )
        .with_use_cols(settings.use_cols.clone())
        .with_validator(validator)
        .with_training_dirs(
            &settings.training_input_path,
            &settings.training_output_path,
        );
        state.converter = converter;
        state.recognizer = recognizer;
        state
    }

    pub fn with_use_cols(mut self, use_cols: Vec<String>) -> Self {
        self.use_cols = use_cols;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn BiluoValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_training_dirs(
        mut self,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        self.training_input = input.into();
        self.training_output = output.into();
        self
    }

    pub fn recognizer(&self) -> Option<&Arc<dyn EntityRecognizer>> {
        self.recognizer.as_ref()
    }

    /// Runs `f` with an annotation service over the locked connection.
    pub fn with_annotations<T>(
        &self,
        f: impl FnOnce(&AnnotationService<'_, SqliteAnnotationRepository<'_>>) -> T,
    ) -> T {
        let conn = self.lock();
        let service = AnnotationService::new(
            SqliteAnnotationRepository::new(&conn),
            self.validator.as_ref(),
        );
        f(&service)
    }

    /// Runs `f` with an export service over the locked connection.
    pub fn with_exports<T>(
        &self,
        f: impl FnOnce(&ExportService<'_, SqliteAnnotationRepository<'_>>) -> T,
    ) -> T {
        let conn = self.lock();
        let service = ExportService::new(
            SqliteAnnotationRepository::new(&conn),
            &self.training_input,
            &self.training_output,
            self.converter.as_deref(),
        );
        f(&service)
    }

    /// Appends every source row to the table, creating it when absent.
    pub fn load_source(&self) -> ServiceResult<LoadReport> {
        self.with_annotations(|service| service.load_source(self.source.as_ref(), &self.use_cols))
    }

    /// Loads the source once when the table does not exist yet.
    ///
    /// Returns `None` when the table was already present.
    pub fn load_if_missing(&self) -> ServiceResult<Option<LoadReport>> {
        if self.with_annotations(|service| service.is_initialized())? {
            return Ok(None);
        }
        info!("event=db_autoload module=api status=start");
        self.load_source().map(Some)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panicking handler leaves no open transaction behind: rusqlite rolls
        // back on drop, so the connection stays usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
