use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use super::SourceError;
use crate::row::{Cell, Row};

/// Where the transaction table sits inside a worksheet.
#[derive(Debug, Clone, Copy)]
pub struct SheetLayout<'a> {
    /// Text of the first cell of the header row.
    pub header_sentinel: &'a str,
    /// Stop at the first row after the header whose first cell is text
    /// (a footer or summary block).
    pub stop_at_text: bool,
}

/// Reads the first worksheet of an `.xlsx` workbook.
pub fn read_path(path: &Path, layout: SheetLayout<'_>) -> Result<Vec<Row>, SourceError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SourceError::EmptyWorkbook)??;

    let cells = range
        .rows()
        .map(|row| row.iter().map(to_cell).collect())
        .collect();

    rows_after_header(cells, layout)
}

/// Zips every row after the header row with the header's column names.
/// Rows before the header are preamble and are dropped.
pub fn rows_after_header(
    cells: Vec<Vec<Cell>>,
    layout: SheetLayout<'_>,
) -> Result<Vec<Row>, SourceError> {
    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for record in cells {
        let first = record.first();
        if matches!(first, Some(Cell::Text(s)) if s == layout.header_sentinel) {
            header = Some(record.iter().map(header_name).collect());
            continue;
        }
        let Some(columns) = header.as_ref() else {
            continue;
        };
        if layout.stop_at_text && matches!(first, Some(Cell::Text(_))) {
            break;
        }
        if record.iter().all(|c| *c == Cell::Empty) {
            continue;
        }

        rows.push(columns.iter().cloned().zip(record).collect());
    }

    if header.is_none() {
        return Err(SourceError::HeaderNotFound(layout.header_sentinel.to_string()));
    }
    Ok(rows)
}

fn header_name(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Number(n) => n.to_string(),
        Cell::DateTime(dt) => dt.to_string(),
        Cell::Empty => String::new(),
    }
}

fn to_cell(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(Decimal::from(*i)),
        // The shortest round-trip rendering of the float, not its binary value.
        Data::Float(f) => Decimal::from_str(&f.to_string())
            .or_else(|_| Decimal::from_scientific(&format!("{f:e}")))
            .map(Cell::Number)
            .unwrap_or_else(|_| Cell::Text(f.to_string())),
        Data::DateTime(_) | Data::DateTimeIso(_) => value
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Text(value.to_string())),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const LAYOUT: SheetLayout<'static> = SheetLayout {
        header_sentinel: "Launch Date",
        stop_at_text: false,
    };

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(s: &str) -> Cell {
        Cell::Number(Decimal::from_str(s).unwrap())
    }

    fn when(y: i32, m: u32, d: u32) -> Cell {
        Cell::DateTime(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn skips_preamble_and_zips_with_header() {
        let cells = vec![
            vec![text("Account statement"), Cell::Empty],
            vec![text("Launch Date"), text("Value Date"), text("Value")],
            vec![when(2024, 1, 4), when(2024, 1, 5), num("-12.5")],
        ];
        let rows = rows_after_header(cells, LAYOUT).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].decimal("Value").unwrap(), Decimal::from_str("-12.5").unwrap());
        assert!(rows[0].get("Account statement").is_none());
    }

    #[test]
    fn missing_header_is_an_error() {
        let cells = vec![vec![text("Something else")], vec![num("1")]];
        assert!(matches!(
            rows_after_header(cells, LAYOUT),
            Err(SourceError::HeaderNotFound(_))
        ));
    }

    #[test]
    fn stops_at_trailing_text_when_asked() {
        let layout = SheetLayout {
            header_sentinel: "Transaction record date ",
            stop_at_text: true,
        };
        let cells = vec![
            vec![text("Transaction record date "), text("Description"), text("Amount")],
            vec![when(2024, 1, 5), text("Cafe"), num("-3")],
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![text("Balance"), Cell::Empty, num("100")],
            vec![when(2024, 1, 6), text("After footer"), num("-1")],
        ];
        let rows = rows_after_header(cells, layout).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("Description").unwrap(), "Cafe");
    }

    #[test]
    fn floats_keep_their_short_form() {
        assert_eq!(to_cell(&Data::Float(0.1)), num("0.1"));
        assert_eq!(to_cell(&Data::Float(-1234.56)), num("-1234.56"));
        assert_eq!(to_cell(&Data::Int(7)), num("7"));
        assert_eq!(to_cell(&Data::Empty), Cell::Empty);
    }

    #[test]
    fn missing_workbook_is_an_error() {
        assert!(read_path(Path::new("/nonexistent/book.xlsx"), LAYOUT).is_err());
    }
}
