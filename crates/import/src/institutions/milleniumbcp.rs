use regex::Regex;
use std::path::Path;

use beanimport_core::{Meta, Transaction};

use crate::config::{AccountDefinition, ConfigError};
use crate::importer::{AccountContext, FileIdentifier, RowExtractor, Statement, StatementKind};
use crate::row::{Row, RowError};
use crate::source::xlsx::SheetLayout;
use crate::source::{self, SourceError};

use super::single_posting;

const FILE_PATTERN: &str = r"^MOVS_\d_\d+\.xlsx$";

// The trailing space is part of the exported header.
const DATE_COLUMN: &str = "Transaction record date ";

const LAYOUT: SheetLayout<'static> = SheetLayout {
    header_sentinel: DATE_COLUMN,
    stop_at_text: true,
};

/// Millennium BCP movements workbook. A summary block follows the table.
pub struct MilleniumBcp {
    ctx: AccountContext,
    file_name: Regex,
}

impl MilleniumBcp {
    pub fn new(definition: &AccountDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            ctx: AccountContext::new(&Self::KIND, definition)?,
            file_name: Regex::new(FILE_PATTERN)?,
        })
    }
}

impl FileIdentifier for MilleniumBcp {
    fn identify(&self, file_name: &str) -> bool {
        self.file_name.is_match(file_name)
    }
}

impl RowExtractor for MilleniumBcp {
    fn extract_row(&self, row: &Row, meta: Meta) -> Result<Option<Transaction>, RowError> {
        let date = row.date(DATE_COLUMN)?;
        let narration = row.text("Description")?;
        let units = self.ctx.amount(row.decimal("Amount")?)?;

        Ok(Some(single_posting(&self.ctx, meta, date, &narration, None, units)))
    }
}

impl Statement for MilleniumBcp {
    const KIND: StatementKind = StatementKind {
        key: "milleniumbcp",
        default_currency: Some("EUR"),
        requires_lastfour: false,
    };

    fn context(&self) -> &AccountContext {
        &self.ctx
    }

    fn load(&self, path: &Path) -> Result<Vec<Row>, SourceError> {
        source::xlsx::read_path(path, LAYOUT)
    }
}
