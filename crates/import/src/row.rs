use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use beanimport_core::LedgerError;

/// A single cell as delivered by a statement source.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(Decimal),
    DateTime(NaiveDateTime),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<Decimal> for Cell {
    fn from(n: Decimal) -> Self {
        Cell::Number(n)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(dt: NaiveDateTime) -> Self {
        Cell::DateTime(dt)
    }
}

#[derive(Error, Debug)]
pub enum RowError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Invalid date in column '{column}': {value}")]
    InvalidDate { column: String, value: String },
    #[error("Invalid amount in column '{column}': {value}")]
    InvalidAmount { column: String, value: String },
    #[error("Invalid value in column '{column}': {value}")]
    InvalidValue { column: String, value: String },
    #[error("No currency configured or present in the row")]
    NoCurrency,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// One tabular record keyed by column header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: HashMap<String, Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, cell: impl Into<Cell>) {
        self.cells.insert(column.into(), cell.into());
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Raw text of a column. Empty cells read as `""`.
    pub fn text(&self, column: &str) -> Result<String, RowError> {
        match self.cell(column)? {
            Cell::Empty => Ok(String::new()),
            Cell::Text(s) => Ok(s.clone()),
            Cell::Number(n) => Ok(n.to_string()),
            Cell::DateTime(dt) => Ok(dt.to_string()),
        }
    }

    /// Trimmed text of a column, `None` when missing or blank.
    pub fn opt_text(&self, column: &str) -> Option<String> {
        self.text(column)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn decimal(&self, column: &str) -> Result<Decimal, RowError> {
        match self.cell(column)? {
            Cell::Number(n) => Ok(*n),
            Cell::Text(s) => parse_decimal(s).ok_or_else(|| RowError::InvalidAmount {
                column: column.to_string(),
                value: s.clone(),
            }),
            other => Err(RowError::InvalidAmount {
                column: column.to_string(),
                value: format!("{other:?}"),
            }),
        }
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate, RowError> {
        match self.cell(column)? {
            Cell::DateTime(dt) => Ok(dt.date()),
            Cell::Text(s) => parse_date(s).ok_or_else(|| RowError::InvalidDate {
                column: column.to_string(),
                value: s.clone(),
            }),
            other => Err(RowError::InvalidDate {
                column: column.to_string(),
                value: format!("{other:?}"),
            }),
        }
    }

    fn cell(&self, column: &str) -> Result<&Cell, RowError> {
        self.cells
            .get(column)
            .ok_or_else(|| RowError::MissingColumn(column.to_string()))
    }
}

impl<K: Into<String>, V: Into<Cell>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, cell) in iter {
            row.insert(column, cell);
        }
        row
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%b %d, %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%b %d, %Y", "%B %d, %Y", "%b %d %Y", "%d %b %Y",
    "%Y%m%d",
];

/// Parses the date formats found across supported exports. Datetimes are
/// truncated to their date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    // "2024-01-05 10:11:12 +0000" and friends: fall back to the leading token.
    let first = s.split_whitespace().next()?;
    if first.len() == s.len() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(first, fmt).ok())
}

/// Parses a money figure, tolerating thousands separators, currency symbols
/// and accounting parentheses for negatives.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let cleaned = s.replace([',', '$', ' ', '\'', '\u{a0}'], "");
    let value = Decimal::from_str(&cleaned).ok()?;
    Some(if negative { -value } else { value })
}
