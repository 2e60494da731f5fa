use regex::Regex;
use std::path::Path;

use beanimport_core::{Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{Row, RowError};
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"^statement-[\dA-Z]+-\d+\.csv";

/// Brim Financial credit card statement.
pub struct Brim {
    ctx: AccountContext,
    file_name: Regex,
}

impl Brim {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
        })
    }
}

impl FileIdentifier for Brim {
    fn identify(&self, file_name: &str) -> bool {
        self.file_name.is_match(file_name)
    }
}

impl RowExtractor for Brim {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        let date = row.date("Transaction Date")?;
        let narration = row.text("Description")?;
        let units = -self.ctx.amount(row.decimal("Amount")?)?;

        Ok(Some(single_posting(&self.ctx, meta, date, &narration, None, units)))
    }
}

impl Statement for Brim {
    const KIND: StatementKind = StatementKind {
        key: "brim",
        default_currency: Some("CAD"),
        requires_lastfour: false,
    };

    fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError> {
        source::csv::read_path(path)
    }
}
