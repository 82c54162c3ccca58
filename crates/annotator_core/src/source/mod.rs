//! Source data readers for the load operation.
//!
//! # Responsibility
//! - Define the `SourceReader` seam between spreadsheets and the load path.
//! - Restrict source tables to the configured column subset.
//!
//! # Invariants
//! - Cell values are copied verbatim as text; empty cells become `None`.
//! - Every row has exactly one value per column.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod excel;

pub use excel::ExcelSource;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug)]
pub enum SourceError {
    Open { path: PathBuf, message: String },
    Sheet { sheet: String, message: String },
    /// Sheet has no header row.
    Empty,
    MissingColumn(String),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, message } => {
                write!(f, "failed to open source `{}`: {message}", path.display())
            }
            Self::Sheet { sheet, message } => {
                write!(f, "failed to read sheet `{sheet}`: {message}")
            }
            Self::Empty => write!(f, "source sheet has no header row"),
            Self::MissingColumn(column) => write!(f, "source has no column `{column}`"),
        }
    }
}

impl Error for SourceError {}

/// Tabular source data: header plus text rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl SourceTable {
    /// Returns a table restricted to `use_cols`, in `use_cols` order.
    ///
    /// An empty subset keeps every column.
    pub fn select(&self, use_cols: &[String]) -> SourceResult<SourceTable> {
        if use_cols.is_empty() {
            return Ok(self.clone());
        }

        let positions = use_cols
            .iter()
            .map(|column| {
                self.columns
                    .iter()
                    .position(|candidate| candidate == column)
                    .ok_or_else(|| SourceError::MissingColumn(column.clone()))
            })
            .collect::<SourceResult<Vec<usize>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|&position| row.get(position).cloned().flatten())
                    .collect()
            })
            .collect();

        Ok(SourceTable {
            columns: use_cols.to_vec(),
            rows,
        })
    }
}

/// Reader of source rows for the load operation.
pub trait SourceReader {
    fn read(&self) -> SourceResult<SourceTable>;
}

/// In-memory source, used by tests and tooling.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    table: SourceTable,
}

impl MemorySource {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            table: SourceTable {
                columns: columns.iter().map(|column| column.to_string()).collect(),
                rows: Vec::new(),
            },
        }
    }

    /// Appends a row; empty strings are stored as `None`.
    pub fn with_row(mut self, values: &[&str]) -> Self {
        let row = values
            .iter()
            .map(|value| (!value.is_empty()).then(|| value.to_string()))
            .collect();
        self.table.rows.push(row);
        self
    }
}

impl SourceReader for MemorySource {
    fn read(&self) -> SourceResult<SourceTable> {
        Ok(self.table.clone())
    }
}
