use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use crate::cell::Cell;
use crate::error::ImportError;

/// Reads the first worksheet of an xlsx/xls/xlsb/ods workbook. Other sheets
/// are ignored.
pub fn parse(data: &[u8]) -> Result<Vec<Vec<Cell>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))?;

    let sheet_count = workbook.sheet_names().len();
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::EmptyFile)??;

    if sheet_count > 1 {
        tracing::debug!(sheet_count, "workbook has several sheets, reading the first");
    }

    Ok(range
        .rows()
        .map(|row| row.iter().map(to_cell).collect())
        .collect())
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::String(s) => Cell::text(s),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::Error(_) => Cell::Empty,
        other => Cell::text(&other.to_string()),
    }
}
