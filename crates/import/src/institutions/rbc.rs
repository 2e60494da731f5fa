use regex::Regex;
use std::path::Path;

use beanimport_core::{Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{Row, RowError};
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"^csv\d+\.csv";

/// Royal Bank of Canada download. A single file holds every account, so the
/// configured last four digits select this account's rows.
pub struct Rbc {
    ctx: AccountContext,
    file_name: Regex,
}

impl Rbc {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
        })
    }

    fn owns(&self, account_number: &str) -> bool {
        self.ctx
            .lastfour
            .as_deref()
            .is_some_and(|lastfour| account_number.ends_with(lastfour))
    }
}

impl FileIdentifier for Rbc {
    fn identify(&self, file_name: &str) -> bool {
        self.file_name.is_match(file_name)
    }
}

impl RowExtractor for Rbc {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        if !self.owns(&row.text("Account Number")?) {
            return Ok(None);
        }

        let date = row.date("Transaction Date")?;
        let payee = row.opt_text("Description 2");
        let narration = row.text("Description 1")?;
        let units = self.ctx.amount(row.decimal("CAD$")?)?;

        Ok(Some(single_posting(
            &self.ctx,
            meta,
            date,
            &narration,
            payee.as_deref(),
            units,
        )))
    }
}

impl Statement for Rbc {
    const KIND: StatementKind = StatementKind {
        key: "rbc",
        default_currency: Some("CAD"),
        requires_lastfour: true,
    };

    fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError> {
        source::csv::read_path(path)
    }
}
