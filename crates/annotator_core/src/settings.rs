//! Service settings read once at startup.
//!
//! # Responsibility
//! - Deserialize the JSON settings file shared with the annotation UI.
//! - Derive database and temp paths from the configured values.
//!
//! # Invariants
//! - Key names match the shared `Settings.json` (`ExcelData`, `UseCols`, ...).
//! - Optional keys fall back to the defaults documented on each field.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_CONVERTER: &[&str] = &["python", "-m", "spacy", "convert"];

/// How BILUO payloads are checked before a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Structural BILUO check inside the process.
    #[default]
    InProcess,
    /// Round-trip through the external converter via temp files.
    Converter,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    /// Source spreadsheet path.
    pub excel_data: PathBuf,
    pub sheet_name: String,
    /// Column subset to import; empty imports every column.
    #[serde(default)]
    pub use_cols: Vec<String>,
    /// Database file stem; empty falls back to the spreadsheet file stem.
    #[serde(default)]
    pub db_name: String,
    /// Directory receiving exported JSON datasets.
    pub training_input_path: PathBuf,
    /// Directory receiving converter output.
    pub training_output_path: PathBuf,
    #[serde(rename = "PyPort")]
    pub port: u16,
    /// Scratch directory for converter validation, default `<TrainingOutputPath>/temp`.
    #[serde(default)]
    pub temp_path: Option<PathBuf>,
    #[serde(default)]
    pub validation: ValidationMode,
    /// Converter program and leading args; input file and output dir are appended.
    /// An empty list disables conversion.
    #[serde(default = "default_converter_command")]
    pub converter_command: Vec<String>,
    /// Entity recognizer program and args; absent disables `/get_entities`.
    #[serde(default)]
    pub ner_command: Option<Vec<String>>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    /// Reads and validates a settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| SettingsError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates settings from JSON text.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(raw).map_err(SettingsError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.excel_data.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("ExcelData cannot be empty"));
        }
        if self.training_input_path.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("TrainingInputPath cannot be empty"));
        }
        if self.training_output_path.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("TrainingOutputPath cannot be empty"));
        }
        if self.port == 0 {
            return Err(SettingsError::Invalid("PyPort must be non-zero"));
        }
        if matches!(&self.ner_command, Some(command) if command.is_empty()) {
            return Err(SettingsError::Invalid("NerCommand cannot be an empty list"));
        }
        Ok(())
    }

    /// SQLite file path: `<DbName>.db`, or `<spreadsheet stem>.db`.
    pub fn db_path(&self) -> PathBuf {
        let stem = if self.db_name.trim().is_empty() {
            self.excel_data
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "annotation".to_string())
        } else {
            self.db_name.trim().to_string()
        };
        PathBuf::from(format!("{stem}.db"))
    }

    pub fn temp_path(&self) -> PathBuf {
        self.temp_path
            .clone()
            .unwrap_or_else(|| self.training_output_path.join("temp"))
    }
}

fn default_converter_command() -> Vec<String> {
    DEFAULT_CONVERTER.iter().map(|part| part.to_string()).collect()
}

#[derive(Debug)]
pub enum SettingsError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(&'static str),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read settings `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid settings json: {err}"),
            Self::Invalid(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Settings, SettingsError, ValidationMode};
    use std::path::PathBuf;

    const MINIMAL: &str = r#"{
        "ExcelData": "data/articles.xlsx",
        "SheetName": "Sheet1",
        "UseCols": ["Title", "Body"],
        "DbName": "",
        "TrainingInputPath": "training/input",
        "TrainingOutputPath": "training/output",
        "PyPort": 5002
    }"#;

    #[test]
    fn minimal_settings_use_defaults() {
        let settings = Settings::from_json(MINIMAL).unwrap();
        assert_eq!(settings.use_cols, vec!["Title", "Body"]);
        assert_eq!(settings.validation, ValidationMode::InProcess);
        assert_eq!(
            settings.converter_command,
            vec!["python", "-m", "spacy", "convert"]
        );
        assert!(settings.ner_command.is_none());
        assert_eq!(settings.db_path(), PathBuf::from("articles.db"));
        assert_eq!(
            settings.temp_path(),
            PathBuf::from("training/output").join("temp")
        );
    }

    #[test]
    fn explicit_db_name_and_validation_mode() {
        let raw = MINIMAL
            .replace(r#""DbName": """#, r#""DbName": "ner""#)
            .replace(
                r#""PyPort": 5002"#,
                r#""PyPort": 5002, "Validation": "converter", "ConverterCommand": []"#,
            );
        let settings = Settings::from_json(&raw).unwrap();
        assert_eq!(settings.db_path(), PathBuf::from("ner.db"));
        assert_eq!(settings.validation, ValidationMode::Converter);
        assert!(settings.converter_command.is_empty());
    }

    #[test]
    fn zero_port_is_rejected() {
        let raw = MINIMAL.replace("5002", "0");
        let err = Settings::from_json(&raw).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(message) if message.contains("PyPort")));
    }

    #[test]
    fn missing_required_key_is_a_parse_error() {
        let err = Settings::from_json(r#"{"SheetName": "Sheet1"}"#).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
