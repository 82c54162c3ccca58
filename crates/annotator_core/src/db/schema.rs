//! Annotation table schema derived from configured source columns.
//!
//! # Responsibility
//! - Create the `annotation` table on first load.
//! - Report the source columns of an existing table.
//!
//! # Invariants
//! - Every identifier is quoted; source column names may contain spaces.
//! - An existing table is never altered, only checked.

use super::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::collections::HashSet;

/// Name of the single persisted table.
pub const ANNOTATION_TABLE: &str = "annotation";

/// Column names owned by the store itself.
pub const RESERVED_COLUMNS: &[&str] = &[
    "index",
    "unique_id",
    "biluo_annotation",
    "non_biluo_annotation",
];

/// Returns whether the `annotation` table exists.
pub fn annotation_table_exists(conn: &Connection) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [ANNOTATION_TABLE],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Creates the `annotation` table when absent.
///
/// When the table already exists, every column in `source_columns` must be
/// present in it; extra columns in the table are tolerated.
///
/// # Errors
/// - `InvalidColumn` for empty, duplicated or reserved names.
/// - `SchemaMismatch` when an existing table lacks configured columns.
pub fn ensure_annotation_table(conn: &Connection, source_columns: &[String]) -> DbResult<()> {
    validate_source_columns(source_columns)?;

    if annotation_table_exists(conn)? {
        let existing: HashSet<String> = table_columns(conn)?.into_iter().collect();
        let missing: Vec<String> = source_columns
            .iter()
            .filter(|column| !existing.contains(column.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DbError::SchemaMismatch { missing });
        }
        return Ok(());
    }

    conn.execute_batch(&create_table_sql(source_columns))?;
    info!(
        "event=table_create module=db status=ok table={ANNOTATION_TABLE} source_columns={}",
        source_columns.len()
    );
    Ok(())
}

/// Returns the source columns of the existing table in declared order.
pub fn table_columns(conn: &Connection) -> DbResult<Vec<String>> {
    if !annotation_table_exists(conn)? {
        return Err(DbError::TableMissing);
    }

    let mut stmt = conn.prepare(&format!(
        "PRAGMA table_info({});",
        quote_ident(ANNOTATION_TABLE)
    ))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;

    let mut columns = Vec::new();
    for name in names {
        let name = name?;
        if !RESERVED_COLUMNS.contains(&name.as_str()) {
            columns.push(name);
        }
    }
    Ok(columns)
}

/// Quotes an SQL identifier, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn validate_source_columns(columns: &[String]) -> DbResult<()> {
    let mut seen = HashSet::new();
    for column in columns {
        if column.trim().is_empty()
            || RESERVED_COLUMNS.contains(&column.as_str())
            || !seen.insert(column.as_str())
        {
            return Err(DbError::InvalidColumn(column.clone()));
        }
    }
    Ok(())
}

fn create_table_sql(source_columns: &[String]) -> String {
    let mut definitions = vec![
        format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident("index")),
        "unique_id TEXT NOT NULL UNIQUE".to_string(),
    ];
    definitions.extend(
        source_columns
            .iter()
            .map(|column| format!("{} TEXT", quote_ident(column))),
    );
    definitions.push("biluo_annotation TEXT".to_string());
    definitions.push("non_biluo_annotation TEXT".to_string());

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        quote_ident(ANNOTATION_TABLE),
        definitions.join(",\n    ")
    )
}

#[cfg(test)]
mod tests {
    use super::{create_table_sql, quote_ident, validate_source_columns};
    use crate::db::DbError;

    #[test]
    fn quote_ident_doubles_embedded_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn reserved_and_duplicate_columns_are_rejected() {
        let reserved = vec!["unique_id".to_string()];
        assert!(matches!(
            validate_source_columns(&reserved),
            Err(DbError::InvalidColumn(name)) if name == "unique_id"
        ));

        let duplicated = vec!["text".to_string(), "text".to_string()];
        assert!(validate_source_columns(&duplicated).is_err());

        let blank = vec!["  ".to_string()];
        assert!(validate_source_columns(&blank).is_err());
    }

    #[test]
    fn create_sql_keeps_column_order() {
        let sql = create_table_sql(&["Title".to_string(), "Body Text".to_string()]);
        let title = sql.find("\"Title\"").expect("title column");
        let body = sql.find("\"Body Text\"").expect("body column");
        let biluo = sql.find("biluo_annotation").expect("annotation column");
        assert!(title < body && body < biluo);
    }
}
