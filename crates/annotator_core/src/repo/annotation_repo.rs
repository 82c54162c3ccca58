//! Annotation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the load/list/update/delete primitives over `annotation`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Rows are returned in insertion (`rowid`) order.
//! - Source columns are never written after insert.
//! - Read paths reject rows they cannot represent instead of masking them.

use crate::db::schema::quote_ident;
use crate::db::{
    annotation_table_exists, ensure_annotation_table, table_columns, DbError, ANNOTATION_TABLE,
};
use crate::model::record::{AnnotationRecord, SourceField, UniqueId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for annotation persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(UniqueId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "annotation record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid annotation data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row to insert during a load: identity plus source values in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub unique_id: UniqueId,
    pub values: Vec<Option<String>>,
}

/// Which annotation representation to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationColumn {
    Biluo,
    NonBiluo,
}

impl AnnotationColumn {
    fn column_name(self) -> &'static str {
        match self {
            Self::Biluo => "biluo_annotation",
            Self::NonBiluo => "non_biluo_annotation",
        }
    }
}

/// Non-null serialized annotation of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAnnotation {
    pub unique_id: UniqueId,
    pub payload: String,
}

/// Repository interface for the annotation table.
pub trait AnnotationRepository {
    fn table_exists(&self) -> RepoResult<bool>;
    fn ensure_table(&self, source_columns: &[String]) -> RepoResult<()>;
    fn insert_records(&self, source_columns: &[String], records: &[NewRecord])
        -> RepoResult<usize>;
    fn list_records(&self) -> RepoResult<Vec<AnnotationRecord>>;
    fn get_record(&self, unique_id: &str) -> RepoResult<Option<AnnotationRecord>>;
    fn count_records(&self) -> RepoResult<u64>;
    fn update_annotations(&self, unique_id: &str, biluo: &str, non_biluo: &str)
        -> RepoResult<()>;
    fn clear_annotations(&self, unique_id: &str) -> RepoResult<()>;
    fn delete_record(&self, unique_id: &str) -> RepoResult<()>;
    fn annotations(&self, column: AnnotationColumn) -> RepoResult<Vec<StoredAnnotation>>;
}

/// SQLite-backed annotation repository.
pub struct SqliteAnnotationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnnotationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn select_sql(&self, columns: &[String]) -> String {
        let mut selected = vec![
            format!("COALESCE({}, rowid)", quote_ident("index")),
            "unique_id".to_string(),
        ];
        selected.extend(columns.iter().map(|column| quote_ident(column)));
        selected.push("biluo_annotation".to_string());
        selected.push("non_biluo_annotation".to_string());
        format!(
            "SELECT {} FROM {}",
            selected.join(", "),
            quote_ident(ANNOTATION_TABLE)
        )
    }

    /// Runs one mutation in its own transaction; zero changed rows is `NotFound`.
    fn execute_single(&self, sql: &str, params: impl rusqlite::Params, unique_id: &str) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(sql, params)?;
        if changed == 0 {
            return Err(RepoError::NotFound(unique_id.to_string()));
        }
        tx.commit()?;
        Ok(())
    }
}

impl AnnotationRepository for SqliteAnnotationRepository<'_> {
    fn table_exists(&self) -> RepoResult<bool> {
        Ok(annotation_table_exists(self.conn)?)
    }

    fn ensure_table(&self, source_columns: &[String]) -> RepoResult<()> {
        Ok(ensure_annotation_table(self.conn, source_columns)?)
    }

    fn insert_records(
        &self,
        source_columns: &[String],
        records: &[NewRecord],
    ) -> RepoResult<usize> {
        let mut columns = vec!["unique_id".to_string()];
        columns.extend(source_columns.iter().map(|column| quote_ident(column)));
        let placeholders = (1..=columns.len())
            .map(|position| format!("?{position}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            quote_ident(ANNOTATION_TABLE),
            columns.join(", ")
        );

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                if record.values.len() != source_columns.len() {
                    return Err(RepoError::InvalidData(format!(
                        "record {} has {} values for {} columns",
                        record.unique_id,
                        record.values.len(),
                        source_columns.len()
                    )));
                }
                let mut bind_values = Vec::with_capacity(columns.len());
                bind_values.push(Value::Text(record.unique_id.clone()));
                bind_values.extend(record.values.iter().map(|value| match value {
                    Some(text) => Value::Text(text.clone()),
                    None => Value::Null,
                }));
                stmt.execute(params_from_iter(bind_values))?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    fn list_records(&self) -> RepoResult<Vec<AnnotationRecord>> {
        let columns = table_columns(self.conn)?;
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY rowid ASC;", self.select_sql(&columns)))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row, &columns)?);
        }
        Ok(records)
    }

    fn get_record(&self, unique_id: &str) -> RepoResult<Option<AnnotationRecord>> {
        let columns = table_columns(self.conn)?;
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE unique_id = ?1;",
            self.select_sql(&columns)
        ))?;
        let mut rows = stmt.query([unique_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row(row, &columns)?));
        }
        Ok(None)
    }

    fn count_records(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", quote_ident(ANNOTATION_TABLE)),
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }

    fn update_annotations(&self, unique_id: &str, biluo: &str, non_biluo: &str) -> RepoResult<()> {
        self.execute_single(
            &format!(
                "UPDATE {}
                 SET biluo_annotation = ?1, non_biluo_annotation = ?2
                 WHERE unique_id = ?3;",
                quote_ident(ANNOTATION_TABLE)
            ),
            params![biluo, non_biluo, unique_id],
            unique_id,
        )
    }

    fn clear_annotations(&self, unique_id: &str) -> RepoResult<()> {
        self.execute_single(
            &format!(
                "UPDATE {}
                 SET biluo_annotation = NULL, non_biluo_annotation = NULL
                 WHERE unique_id = ?1;",
                quote_ident(ANNOTATION_TABLE)
            ),
            params![unique_id],
            unique_id,
        )
    }

    fn delete_record(&self, unique_id: &str) -> RepoResult<()> {
        self.execute_single(
            &format!(
                "DELETE FROM {} WHERE unique_id = ?1;",
                quote_ident(ANNOTATION_TABLE)
            ),
            params![unique_id],
            unique_id,
        )
    }

    fn annotations(&self, column: AnnotationColumn) -> RepoResult<Vec<StoredAnnotation>> {
        let name = column.column_name();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT unique_id, {name}
             FROM {}
             WHERE {name} IS NOT NULL
             ORDER BY rowid ASC;",
            quote_ident(ANNOTATION_TABLE)
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredAnnotation {
                unique_id: row.get(0)?,
                payload: row.get(1)?,
            })
        })?;

        let mut annotations = Vec::new();
        for annotation in rows {
            annotations.push(annotation?);
        }
        Ok(annotations)
    }
}

fn parse_record_row(row: &Row<'_>, columns: &[String]) -> RepoResult<AnnotationRecord> {
    let index = match row.get::<_, Value>(0)? {
        Value::Integer(index) => index,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid index value `{other:?}` in {ANNOTATION_TABLE}.index"
            )));
        }
    };

    let fields = columns
        .iter()
        .enumerate()
        .map(|(offset, name)| {
            Ok(SourceField {
                name: name.clone(),
                value: value_to_text(row.get::<_, Value>(offset + 2)?),
            })
        })
        .collect::<RepoResult<Vec<_>>>()?;

    let annotations_at = columns.len() + 2;
    Ok(AnnotationRecord {
        index,
        unique_id: row.get(1)?,
        fields,
        biluo_annotation: row.get(annotations_at)?,
        non_biluo_annotation: row.get(annotations_at + 1)?,
    })
}

/// Renders cells written by older loaders that stored numbers natively.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(number) => Some(number.to_string()),
        Value::Real(number) => Some(number.to_string()),
        Value::Text(text) => Some(text),
        Value::Blob(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
    }
}
