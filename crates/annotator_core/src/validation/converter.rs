//! Converter round-trip validation through temp files.

use super::{with_document_id, BiluoValidator, ValidationError, ValidationResult};
use crate::convert::Converter;
use log::warn;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Writes the document as a one-element batch to `<temp>/<uuid>.json` and
/// accepts it when the converter exits successfully.
///
/// Temp input and `<uuid>.spacy` output are removed best-effort afterwards.
pub struct ConverterValidator {
    converter: Arc<dyn Converter>,
    temp_dir: PathBuf,
}

impl ConverterValidator {
    pub fn new(converter: Arc<dyn Converter>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            converter,
            temp_dir: temp_dir.into(),
        }
    }
}

impl BiluoValidator for ConverterValidator {
    fn validate(&self, document: &Value) -> ValidationResult<()> {
        std::fs::create_dir_all(&self.temp_dir).map_err(|err| ValidationError::Io {
            path: self.temp_dir.clone(),
            source: err,
        })?;

        let name = Uuid::new_v4().to_string();
        let input = self.temp_dir.join(format!("{name}.json"));
        let output = self.temp_dir.join(format!("{name}.spacy"));

        let batch = Value::Array(vec![with_document_id(document, 0)]);
        let bytes = serde_json::to_vec(&batch).map_err(|err| ValidationError::Io {
            path: input.clone(),
            source: err.into(),
        })?;
        std::fs::write(&input, bytes).map_err(|err| ValidationError::Io {
            path: input.clone(),
            source: err,
        })?;

        let result = self.converter.convert(&input, &self.temp_dir);
        remove_best_effort(&input);
        if result.is_ok() {
            remove_best_effort(&output);
        }
        result.map_err(ValidationError::Converter)
    }
}

fn remove_best_effort(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        warn!(
            "event=temp_cleanup module=validation status=error path={} error={}",
            path.display(),
            err
        );
    }
}
