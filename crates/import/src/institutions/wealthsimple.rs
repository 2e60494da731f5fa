use regex::Regex;
use std::path::Path;

use beanimport_core::{Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{Row, RowError};
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"^monthly-statement-transactions-[\d\w]{5}([\d\w]{4})CAD[-\d]+.csv$";

pub struct Wealthsimple {
    ctx: AccountContext,
    file_name: Regex,
}

impl Wealthsimple {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
        })
    }
}

impl FileIdentifier for Wealthsimple {
    fn identify(&self, file_name: &str) -> bool {
        self.ctx.matches_file(&self.file_name, file_name)
    }
}

impl RowExtractor for Wealthsimple {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        let date = row.date("date")?;
        let narration = row.text("description")?;
        let units = self.ctx.amount(row.decimal("amount")?)?;

        Ok(Some(single_posting(&self.ctx, meta, date, &narration, None, units)))
    }
}

impl Statement for Wealthsimple {
    const KIND: StatementKind = StatementKind {
        key: "wealthsimple",
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
