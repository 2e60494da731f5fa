use regex::Regex;
use std::path::Path;

use beanimport_core::{Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{parse_date, Row, RowError};
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"^Transactions.*\.csv";

/// American Express card activity export. Charges are positive in the file.
pub struct Amex {
    ctx: AccountContext,
    file_name: Regex,
}

impl Amex {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
        })
    }
}

impl FileIdentifier for Amex {
    fn identify(&self, file_name: &str) -> bool {
        self.file_name.is_match(file_name)
    }
}

impl RowExtractor for Amex {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        // "01/05/2024  Fri" style: only the first token is the date.
        let raw = row.text("Date")?;
        let date = raw
            .split_whitespace()
            .next()
            .and_then(parse_date)
            .ok_or_else(|| RowError::InvalidDate {
                column: "Date".to_string(),
                value: raw.clone(),
            })?;
        let payee = row.text("Description")?;
        let units = -self.ctx.amount(row.decimal("Amount")?)?;

        Ok(Some(single_posting(&self.ctx, meta, date, "", Some(&payee), units)))
    }
}

impl Statement for Amex {
    const KIND: StatementKind = StatementKind {
        key: "amex",
        default_currency: Some("USD"),
        requires_lastfour: false,
    };

    fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError> {
        source::csv::read_path(path)
    }
}
