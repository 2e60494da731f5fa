use regex::Regex;
use std::path::Path;

use beanimport_core::{Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{Row, RowError};
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"^(?:\d+ xxxx )?xxxx ?(\d+)\.CSV$";

/// Tangerine chequing, savings and credit card downloads.
pub struct Tangerine {
    ctx: AccountContext,
    file_name: Regex,
}

impl Tangerine {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
        })
    }
}

impl FileIdentifier for Tangerine {
    fn identify(&self, file_name: &str) -> bool {
        self.ctx.matches_file(&self.file_name, file_name)
    }
}

impl RowExtractor for Tangerine {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        // Bank accounts say "Date", credit cards "Transaction date".
        let date = match row.opt_text("Date") {
            Some(_) => row.date("Date")?,
            None => row.date("Transaction date")?,
        };
        let payee = row.opt_text("Memo");
        let narration = row.text("Name")?;
        let units = self.ctx.amount(row.decimal("Amount")?)?;
        if units.is_zero() {
            return Ok(None);
        }

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

impl Statement for Tangerine {
    const KIND: StatementKind = StatementKind {
        key: "tangerine",
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
