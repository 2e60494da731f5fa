use regex::Regex;
use std::path::Path;

use beanimport_core::{Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{Row, RowError};
use crate::source::xlsx::SheetLayout;
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"^mov\d+(\d{4})-\d+-\d+.xlsx$";

const LAYOUT: SheetLayout<'static> = SheetLayout {
    header_sentinel: "Launch Date",
    stop_at_text: false,
};

/// ActivoBank movements workbook.
pub struct ActivoBank {
    ctx: AccountContext,
    file_name: Regex,
}

impl ActivoBank {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
        })
    }
}

impl FileIdentifier for ActivoBank {
    fn identify(&self, file_name: &str) -> bool {
        self.ctx.matches_file(&self.file_name, file_name)
    }
}

impl RowExtractor for ActivoBank {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        let date = row.date("Value Date")?;
        let narration = row.text("Description")?;
        let units = self.ctx.amount(row.decimal("Value")?)?;

        Ok(Some(single_posting(&self.ctx, meta, date, &narration, None, units)))
    }
}

impl Statement for ActivoBank {
    const KIND: StatementKind = StatementKind {
        key: "activobank",
        default_currency: Some("EUR"),
        requires_lastfour: true,
    };

    fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError> {
        source::xlsx::read_path(path, LAYOUT)
    }
}
