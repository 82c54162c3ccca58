//! SQLite storage bootstrap and annotation table schema.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the annotation store.
//! - Create the `annotation` table from the configured source columns.
//!
//! # Invariants
//! - The table has one nullable `TEXT` column per source column, framed by
//!   `index`/`unique_id` in front and the two annotation columns at the end.
//! - Source column names never collide with the reserved column names.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory};
pub use schema::{
    annotation_table_exists, ensure_annotation_table, table_columns, ANNOTATION_TABLE,
    RESERVED_COLUMNS,
};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Source column name is empty, duplicated or reserved.
    InvalidColumn(String),
    /// Existing table lacks configured source columns.
    SchemaMismatch { missing: Vec<String> },
    TableMissing,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidColumn(name) => write!(f, "invalid source column name `{name}`"),
            Self::SchemaMismatch { missing } => write!(
                f,
                "table `{ANNOTATION_TABLE}` is missing source columns: {}",
                missing.join(", ")
            ),
            Self::TableMissing => write!(f, "table `{ANNOTATION_TABLE}` does not exist"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
