//! Spreadsheet reader backed by `calamine`.

use super::{SourceError, SourceReader, SourceResult, SourceTable};
use calamine::{open_workbook_auto, Data, Range, Reader};
use log::info;
use std::collections::HashSet;
use std::path::PathBuf;

/// Reads one sheet of an `.xlsx`/`.xls`/`.ods` workbook.
///
/// The first row is the header. Rows where every cell is empty are skipped.
/// Header naming follows pandas: blank headers become `Unnamed: N` and
/// repeated names get `.1`, `.2`, ... suffixes.
#[derive(Debug, Clone)]
pub struct ExcelSource {
    path: PathBuf,
    sheet: String,
}

impl ExcelSource {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.into(),
        }
    }
}

impl SourceReader for ExcelSource {
    fn read(&self) -> SourceResult<SourceTable> {
        let mut workbook = open_workbook_auto(&self.path).map_err(|err| SourceError::Open {
            path: self.path.clone(),
            message: err.to_string(),
        })?;
        let range = workbook
            .worksheet_range(&self.sheet)
            .map_err(|err| SourceError::Sheet {
                sheet: self.sheet.clone(),
                message: err.to_string(),
            })?;

        let table = table_from_range(&range)?;
        info!(
            "event=source_read module=source status=ok sheet={} columns={} rows={}",
            self.sheet,
            table.columns.len(),
            table.rows.len()
        );
        Ok(table)
    }
}

fn table_from_range(range: &Range<Data>) -> SourceResult<SourceTable> {
    let mut rows = range.rows();
    let header = rows.next().ok_or(SourceError::Empty)?;
    let columns = dedupe_headers(
        header
            .iter()
            .enumerate()
            .map(|(position, cell)| {
                render_cell(cell).unwrap_or_else(|| format!("Unnamed: {position}"))
            })
            .collect(),
    );

    let rows = rows
        .map(|row| {
            (0..columns.len())
                .map(|position| row.get(position).and_then(render_cell))
                .collect::<Vec<Option<String>>>()
        })
        .filter(|row| row.iter().any(Option::is_some))
        .collect();

    Ok(SourceTable { columns, rows })
}

fn dedupe_headers(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut suffix = 1;
            while seen.contains(&candidate) {
                candidate = format!("{name}.{suffix}");
                suffix += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Integral floats render without a fraction (`7.0` -> `"7"`), matching the
/// int conversion pandas applies to whole-number cells.
fn render_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(value) if value.is_empty() => None,
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            Some(format!("{value:.0}"))
        }
        Data::DateTime(value) => Some(
            value
                .as_datetime()
                .map(|datetime| datetime.to_string())
                .unwrap_or_else(|| value.as_f64().to_string()),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{render_cell, table_from_range, ExcelSource};
    use crate::source::{SourceError, SourceReader};
    use calamine::{Data, Range};

    #[test]
    fn header_and_rows_are_rendered_as_text() {
        let mut range = Range::new((0, 0), (3, 2));
        range.set_value((0, 0), Data::String("Title".to_string()));
        range.set_value((0, 2), Data::String("Score".to_string()));
        range.set_value((1, 0), Data::String("Acme hires Bob".to_string()));
        range.set_value((1, 2), Data::Int(7));
        range.set_value((3, 0), Data::String("Second".to_string()));
        range.set_value((3, 1), Data::Bool(true));

        let table = table_from_range(&range).unwrap();
        assert_eq!(table.columns, vec!["Title", "Unnamed: 1", "Score"]);
        assert_eq!(table.rows.len(), 2, "blank row 2 is skipped");
        assert_eq!(
            table.rows[0],
            vec![Some("Acme hires Bob".to_string()), None, Some("7".to_string())]
        );
        assert_eq!(table.rows[1][1].as_deref(), Some("true"));
    }

    #[test]
    fn repeated_headers_get_numeric_suffixes() {
        let mut range = Range::new((0, 0), (1, 3));
        for (column, name) in ["Text", "Text", "Text.1", "Text"].into_iter().enumerate() {
            range.set_value((0, column as u32), Data::String(name.to_string()));
        }
        range.set_value((1, 0), Data::String("a".to_string()));

        let table = table_from_range(&range).unwrap();
        assert_eq!(table.columns, vec!["Text", "Text.1", "Text.1.1", "Text.2"]);
    }

    #[test]
    fn numbers_render_like_pandas_cells() {
        assert_eq!(render_cell(&Data::Float(7.0)).as_deref(), Some("7"));
        assert_eq!(render_cell(&Data::Float(-3.0)).as_deref(), Some("-3"));
        assert_eq!(render_cell(&Data::Float(7.25)).as_deref(), Some("7.25"));
        assert_eq!(render_cell(&Data::Int(12)).as_deref(), Some("12"));
        assert_eq!(render_cell(&Data::String(String::new())), None);
    }

    #[test]
    fn missing_workbook_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ExcelSource::new(dir.path().join("absent.xlsx"), "Sheet1");
        assert!(matches!(source.read(), Err(SourceError::Open { .. })));
    }
}
