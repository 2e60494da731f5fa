//! Loaders that turn statement files into [`Row`](crate::row::Row)s.
//!
//! Each loader opens, reads and closes its file before returning.

pub mod csv;
pub mod pdf;
pub mod xlsx;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("Workbook has no worksheets")]
    EmptyWorkbook,
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("Header row not found: '{0}'")]
    HeaderNotFound(String),
    #[error("Table anchor not found: '{0}'")]
    AnchorNotFound(String),
}
