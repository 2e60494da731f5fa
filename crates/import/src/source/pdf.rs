use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use super::SourceError;
use crate::row::{Cell, Row};

/// Anchors delimiting the transaction table in a statement's text.
#[derive(Debug, Clone, Copy)]
pub struct TableAnchors<'a> {
    /// Line directly above the table. The last occurrence is used.
    pub header: &'a str,
    /// Text contained in the first line below the table.
    pub footer: &'a str,
}

pub fn read_path(path: &Path, anchors: TableAnchors<'_>) -> Result<Vec<Row>, SourceError> {
    let text = pdf_extract::extract_text(path).map_err(|e| SourceError::Pdf(e.to_string()))?;
    table_between(&text, anchors)
}

/// Recovers a table from laid-out text.
///
/// The first non-blank line between the anchors holds the column names.
/// Fields are runs of text separated by two or more spaces and are assigned
/// to the column whose header starts nearest to them. A line with nothing
/// under the first column continues the previous row.
pub fn table_between(text: &str, anchors: TableAnchors<'_>) -> Result<Vec<Row>, SourceError> {
    let lines: Vec<&str> = text.lines().collect();

    let start = lines
        .iter()
        .rposition(|l| l.trim() == anchors.header)
        .ok_or_else(|| SourceError::AnchorNotFound(anchors.header.to_string()))?;
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.contains(anchors.footer))
        .map(|offset| start + 1 + offset)
        .ok_or_else(|| SourceError::AnchorNotFound(anchors.footer.to_string()))?;

    let mut body = lines[start + 1..end].iter().filter(|l| !l.trim().is_empty());
    let header = body
        .next()
        .ok_or_else(|| SourceError::HeaderNotFound(anchors.header.to_string()))?;
    let columns = fields(header);

    let mut table: Vec<Vec<String>> = Vec::new();
    for line in body {
        let mut cells = vec![String::new(); columns.len()];
        for (offset, value) in fields(line) {
            let index = nearest_column(&columns, offset);
            if !cells[index].is_empty() {
                cells[index].push(' ');
            }
            cells[index].push_str(&value);
        }

        match table.last_mut() {
            Some(previous) if cells[0].is_empty() => {
                for (prev, extra) in previous.iter_mut().zip(cells) {
                    if extra.is_empty() {
                        continue;
                    }
                    if !prev.is_empty() {
                        prev.push(' ');
                    }
                    prev.push_str(&extra);
                }
            }
            _ => table.push(cells),
        }
    }

    Ok(table
        .into_iter()
        .map(|cells| {
            columns
                .iter()
                .map(|(_, name)| name.clone())
                .zip(cells.into_iter().map(|c| if c.is_empty() { Cell::Empty } else { Cell::Text(c) }))
                .collect()
        })
        .collect())
}

fn field_regex() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\S+(?: \S+)*").expect("invalid regex"))
}

/// Fields of a line with their starting column (in characters).
fn fields(line: &str) -> Vec<(usize, String)> {
    field_regex()
        .find_iter(line)
        .map(|m| (line[..m.start()].chars().count(), m.as_str().to_string()))
        .collect()
}

fn nearest_column(columns: &[(usize, String)], offset: usize) -> usize {
    columns
        .iter()
        .enumerate()
        .min_by_key(|(_, (start, _))| start.abs_diff(offset))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANCHORS: TableAnchors<'static> = TableAnchors {
        header: "Activity details",
        footer: "Equitable Bank Towe",
    };

    const STATEMENT: &str = "\
Activity details
(continued on next page)

Activity details
Date          Description              Withdrawals     Deposits     Balance
Jan 5, 2024   Coffee shop              $4.50                        $95.50
Jan 6, 2024   Payroll deposit                          $1,000.00    $1,095.50
              ACME Corp
Jan 7, 2024   Interest                                 $0.12        $1,095.62
Equitable Bank Tower, 30 St Clair Ave W
";

    #[test]
    fn extracts_rows_between_anchors() {
        let rows = table_between(STATEMENT, ANCHORS).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].text("Date").unwrap(), "Jan 5, 2024");
        assert_eq!(rows[0].text("Withdrawals").unwrap(), "$4.50");
        assert_eq!(rows[0].get("Deposits"), Some(&Cell::Empty));
        assert_eq!(rows[1].text("Deposits").unwrap(), "$1,000.00");
    }

    #[test]
    fn continuation_lines_merge_into_previous_row() {
        let rows = table_between(STATEMENT, ANCHORS).unwrap();
        assert_eq!(rows[1].text("Description").unwrap(), "Payroll deposit ACME Corp");
        assert_eq!(rows[2].text("Description").unwrap(), "Interest");
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let result = table_between("nothing to see here", ANCHORS);
        assert!(matches!(result, Err(SourceError::AnchorNotFound(a)) if a == "Activity details"));

        let result = table_between("Activity details\nDate  Amount\n", ANCHORS);
        assert!(matches!(result, Err(SourceError::AnchorNotFound(a)) if a == "Equitable Bank Towe"));
    }
}
