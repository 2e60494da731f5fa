use regex::Regex;
use std::path::Path;

use beanimport_core::{Amount, Currency, Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{
    AccountContext, FileIdentifier, RowErrorPolicy, RowExtractor, Statement, StatementKind,
};
use crate::row::{Row, RowError};
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"^account-statement.*\.csv";

const FIELDS: &[&str] = &[
    "Type",
    "Product",
    "Started Date",
    "Completed Date",
    "Description",
    "Amount",
    "Fee",
    "Currency",
    "State",
    "Balance",
];

/// Revolut account statement. Malformed rows are dropped rather than
/// failing the whole file.
pub struct Revolut {
    ctx: AccountContext,
    file_name: Regex,
}

impl Revolut {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
        })
    }
}

impl FileIdentifier for Revolut {
    fn identify(&self, file_name: &str) -> bool {
        self.file_name.is_match(file_name)
    }
}

impl RowExtractor for Revolut {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        // Pending rows have no balance yet; they fail here and are dropped.
        row.decimal("Balance")?;

        let currency = Currency::new(&row.text("Currency")?)?;
        let units = Amount::new(row.decimal("Amount")?, currency);
        let date = row.date("Completed Date")?;
        let narration = row.text("Description")?;

        Ok(Some(single_posting(&self.ctx, meta, date, &narration, None, units)))
    }
}

impl Statement for Revolut {
    const KIND: StatementKind = StatementKind {
        key: "revolut",
        default_currency: Some("EUR"),
        requires_lastfour: false,
    };

    fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError> {
        source::csv::read_path_with_fields(path, FIELDS)
    }

    fn row_error_policy(&self) -> RowErrorPolicy {
        RowErrorPolicy::Skip
    }
}
