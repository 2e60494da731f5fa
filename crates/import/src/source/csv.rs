use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::SourceError;
use crate::row::{Cell, Row};

/// Reads a CSV whose first line names the columns.
pub fn read_rows<R: Read>(data: R) -> Result<Vec<Row>, SourceError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(column, field)| (column.clone(), Cell::from(field)))
                .collect(),
        );
    }

    Ok(rows)
}

/// Reads a CSV using fixed column names. The file's own header line is
/// skipped and fields are trimmed.
pub fn read_rows_with_fields<R: Read>(data: R, fields: &[&str]) -> Result<Vec<Row>, SourceError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(data);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(
            fields
                .iter()
                .zip(record.iter())
                .map(|(column, field)| (*column, Cell::from(field)))
                .collect(),
        );
    }

    Ok(rows)
}

pub fn read_path(path: &Path) -> Result<Vec<Row>, SourceError> {
    read_rows(File::open(path)?)
}

pub fn read_path_with_fields(path: &Path, fields: &[&str]) -> Result<Vec<Row>, SourceError> {
    read_rows_with_fields(File::open(path)?, fields)
}

// Some exports put a byte-order mark in front of a quoted first header,
// which leaves `\u{feff}"Date"` as the column name.
fn clean_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .trim()
        .trim_matches('"')
        .to_string()
}
